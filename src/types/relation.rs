use serde::{Deserialize, Serialize};

use super::models::Goal;
use crate::error::{Error, Result};

/// Relation kinds accepted at the API surface. `DependsOn` is the inverse
/// view of `Blocks` and is never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    Blocks,
    DependsOn,
    RelatedTo,
    Connected,
}

impl RelationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Blocks => "blocks",
            RelationKind::DependsOn => "dependsOn",
            RelationKind::RelatedTo => "relatedTo",
            RelationKind::Connected => "connected",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blocks" => Some(RelationKind::Blocks),
            "dependsOn" => Some(RelationKind::DependsOn),
            "relatedTo" => Some(RelationKind::RelatedTo),
            "connected" => Some(RelationKind::Connected),
            _ => None,
        }
    }
}

/// Kinds as they exist in storage: one row per edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredKind {
    Blocks,
    Related,
    Connected,
}

impl StoredKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredKind::Blocks => "blocks",
            StoredKind::Related => "related",
            StoredKind::Connected => "connected",
        }
    }
}

/// A canonical edge ready for storage. Directed `blocks` rows read
/// a→b as "a blocks b"; symmetric rows hold the ordered (min, max) pair
/// so an edge is one row no matter which endpoint was named first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEdge {
    pub kind: StoredKind,
    pub a_id: String,
    pub b_id: String,
}

impl StoredEdge {
    /// Canonicalizes an API-level relation into its stored form.
    /// Fails `InvalidRelation` on self-edges, for every kind.
    pub fn canonicalize(kind: RelationKind, from_id: &str, to_id: &str) -> Result<Self> {
        if from_id == to_id {
            return Err(Error::InvalidRelation(
                "a goal cannot relate to itself".to_string(),
            ));
        }

        let edge = match kind {
            RelationKind::Blocks => StoredEdge {
                kind: StoredKind::Blocks,
                a_id: from_id.to_string(),
                b_id: to_id.to_string(),
            },
            RelationKind::DependsOn => StoredEdge {
                kind: StoredKind::Blocks,
                a_id: to_id.to_string(),
                b_id: from_id.to_string(),
            },
            RelationKind::RelatedTo | RelationKind::Connected => {
                let stored = if kind == RelationKind::RelatedTo {
                    StoredKind::Related
                } else {
                    StoredKind::Connected
                };
                let (a, b) = if from_id < to_id {
                    (from_id, to_id)
                } else {
                    (to_id, from_id)
                };
                StoredEdge {
                    kind: stored,
                    a_id: a.to_string(),
                    b_id: b.to_string(),
                }
            }
        };

        Ok(edge)
    }
}

/// The four relation views of one goal. `depends_on` is computed from
/// inbound `blocks` rows; the symmetric views read both endpoints.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRelations {
    pub blocks: Vec<Goal>,
    pub depends_on: Vec<Goal>,
    pub related_to: Vec<Goal>,
    pub connected: Vec<Goal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_edge_rejected_for_every_kind() {
        for kind in [
            RelationKind::Blocks,
            RelationKind::DependsOn,
            RelationKind::RelatedTo,
            RelationKind::Connected,
        ] {
            let result = StoredEdge::canonicalize(kind, "g-1", "g-1");
            assert!(matches!(result, Err(Error::InvalidRelation(_))));
        }
    }

    #[test]
    fn test_depends_on_is_inverse_of_blocks() {
        let blocks = StoredEdge::canonicalize(RelationKind::Blocks, "g-1", "g-2").unwrap();
        let depends = StoredEdge::canonicalize(RelationKind::DependsOn, "g-2", "g-1").unwrap();
        assert_eq!(blocks, depends);
    }

    #[test]
    fn test_symmetric_kinds_canonicalize_both_orders() {
        let ab = StoredEdge::canonicalize(RelationKind::RelatedTo, "g-1", "g-2").unwrap();
        let ba = StoredEdge::canonicalize(RelationKind::RelatedTo, "g-2", "g-1").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.a_id, "g-1");
        assert_eq!(ab.b_id, "g-2");
    }

    #[test]
    fn test_blocks_preserves_direction() {
        let ab = StoredEdge::canonicalize(RelationKind::Blocks, "g-2", "g-1").unwrap();
        assert_eq!(ab.a_id, "g-2");
        assert_eq!(ab.b_id, "g-1");
    }
}
