use serde::{Deserialize, Serialize};

use super::models::{Activity, Ghost, User};

/// The concrete identity behind an Activity. Exactly one variant is ever
/// populated; consumption sites match exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    User(User),
    Ghost(Ghost),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorKind {
    User,
    Ghost,
}

impl ActorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::User => "USER",
            ActorKind::Ghost => "GHOST",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(ActorKind::User),
            "GHOST" => Some(ActorKind::Ghost),
            _ => None,
        }
    }
}

/// Display projection of an Activity, the merged user-or-ghost view
/// handed to clients for owner/issuer/participant fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayActor {
    /// Activity id; actor equality is by this id only.
    pub id: String,
    pub kind: ActorKind,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl DisplayActor {
    /// Human-readable label, never empty: name when known, email otherwise.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

impl Activity {
    #[must_use]
    pub fn kind(&self) -> ActorKind {
        match &self.actor {
            Actor::User(_) => ActorKind::User,
            Actor::Ghost(_) => ActorKind::Ghost,
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        match &self.actor {
            Actor::User(user) => &user.email,
            Actor::Ghost(ghost) => &ghost.email,
        }
    }

    /// Resolves the activity to its display projection. Total over every
    /// valid Activity: a ghost has no name or image, but always an email.
    #[must_use]
    pub fn display(&self) -> DisplayActor {
        match &self.actor {
            Actor::User(user) => DisplayActor {
                id: self.id.clone(),
                kind: ActorKind::User,
                email: user.email.clone(),
                name: user.name.clone(),
                image: user.image.clone(),
            },
            Actor::Ghost(ghost) => DisplayActor {
                id: self.id.clone(),
                kind: ActorKind::Ghost,
                email: ghost.email.clone(),
                name: None,
                image: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::Role;

    fn activity(actor: Actor) -> Activity {
        Activity {
            id: "act-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            actor,
        }
    }

    #[test]
    fn test_display_user_prefers_name() {
        let act = activity(Actor::User(User {
            id: "user-1".to_string(),
            email: "ada@example.com".to_string(),
            name: Some("Ada".to_string()),
            image: None,
            role: Role::User,
        }));

        let display = act.display();
        assert_eq!(display.kind, ActorKind::User);
        assert_eq!(display.label(), "Ada");
    }

    #[test]
    fn test_display_ghost_falls_back_to_email() {
        let act = activity(Actor::Ghost(Ghost {
            id: "ghost-1".to_string(),
            email: "a@x.com".to_string(),
            host_id: "act-0".to_string(),
        }));

        let display = act.display();
        assert_eq!(display.kind, ActorKind::Ghost);
        assert_eq!(display.name, None);
        assert_eq!(display.label(), "a@x.com");
    }

    #[test]
    fn test_activity_serializes_with_tagged_actor() {
        let act = activity(Actor::Ghost(Ghost {
            id: "ghost-1".to_string(),
            email: "a@x.com".to_string(),
            host_id: "act-0".to_string(),
        }));

        let json = serde_json::to_value(&act).unwrap();
        assert!(json.get("ghost").is_some());
        assert!(json.get("user").is_none());
    }
}
