mod common;

use chrono::Utc;
use northstar::error::Error;
use northstar::store::Store;
use northstar::types::{ActorKind, RelationKind, Role, SortOrder, TargetKind, User};
use uuid::Uuid;

use common::{env, flow, ghost, goal, project, user};

#[test]
fn ghost_owned_goal_computes_a_ghost_owner() {
    let env = env();
    let store = &env.store;

    let inviter = user(store, "host@example.com", Some("Host"));
    let casper = ghost(store, "a@x.com", &inviter);

    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &inviter);
    let g = goal(store, &proj, "Ghost's goal", &casper, None);

    let owner = store
        .get_activity(&g.owner_id)
        .unwrap()
        .unwrap()
        .display();

    assert_eq!(owner.kind, ActorKind::Ghost);
    assert_eq!(owner.email, "a@x.com");
    assert_eq!(owner.name, None);
    assert_eq!(owner.label(), "a@x.com");
}

#[test]
fn every_activity_resolves_to_a_display_identity() {
    let env = env();
    let store = &env.store;

    let named = user(store, "ada@example.com", Some("Ada"));
    let unnamed = user(store, "bare@example.com", None);
    let casper = ghost(store, "ghost@example.com", &named);

    for id in [&named.id, &unnamed.id, &casper.id] {
        let display = store.get_activity(id).unwrap().unwrap().display();
        assert!(!display.label().is_empty());
    }
}

#[test]
fn find_activities_matches_name_and_email_with_kind_facet() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", Some("Ada Lovelace"));
    user(store, "grace@example.com", Some("Grace"));
    let casper = ghost(store, "ada.invite@example.com", &ada);

    // Substring over name or email, both kinds
    let all = store.find_activities("ada", None, SortOrder::Asc).unwrap();
    assert_eq!(all.len(), 2);

    let ghosts = store
        .find_activities("ada", Some(ActorKind::Ghost), SortOrder::Asc)
        .unwrap();
    assert_eq!(ghosts.len(), 1);
    assert_eq!(ghosts[0].id, casper.id);

    let users = store
        .find_activities("lovelace", Some(ActorKind::User), SortOrder::Asc)
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, ada.id);
}

#[test]
fn promotion_keeps_edges_memberships_and_ownership_valid() {
    let env = env();
    let store = &env.store;

    let inviter = user(store, "host@example.com", None);
    let casper = ghost(store, "invitee@example.com", &inviter);

    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &inviter);
    let owned = goal(store, &proj, "Owned by ghost", &casper, None);
    let other = goal(store, &proj, "Blocked goal", &inviter, None);

    store
        .link_goals(RelationKind::Blocks, &owned.id, &other.id)
        .unwrap();
    store
        .set_watcher(TargetKind::Project, &proj.id, &casper.id, true)
        .unwrap();

    // The invitee registers; the ghost becomes a user in place
    let registered = store
        .promote_ghost(
            &casper.id,
            &User {
                id: Uuid::new_v4().to_string(),
                email: "invitee@example.com".to_string(),
                name: Some("Grace".to_string()),
                image: None,
                role: Role::User,
            },
        )
        .unwrap();

    // Same logical actor: the activity id never changed
    assert_eq!(registered.id, casper.id);

    let owner = store
        .get_goal(&owned.id)
        .unwrap()
        .unwrap()
        .owner_id;
    assert_eq!(owner, casper.id);
    let display = store.get_activity(&owner).unwrap().unwrap().display();
    assert_eq!(display.kind, ActorKind::User);
    assert_eq!(display.label(), "Grace");

    let watchers = store.list_watchers(TargetKind::Project, &proj.id).unwrap();
    assert!(watchers.iter().any(|a| a.id == casper.id));

    assert_eq!(store.goal_relations(&other.id).unwrap().depends_on.len(), 1);
}

#[test]
fn ghost_email_cannot_collide_with_users_or_ghosts() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    ghost(store, "pending@example.com", &ada);

    // Second ghost with the same email
    let now = Utc::now();
    let dup = northstar::types::Activity {
        id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
        actor: northstar::types::Actor::Ghost(northstar::types::Ghost {
            id: Uuid::new_v4().to_string(),
            email: "pending@example.com".to_string(),
            host_id: ada.id.clone(),
        }),
    };
    assert!(matches!(
        store.create_activity(&dup),
        Err(Error::Conflict(_))
    ));

    // A ghost for an email that already registered
    let dup = northstar::types::Activity {
        id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
        actor: northstar::types::Actor::Ghost(northstar::types::Ghost {
            id: Uuid::new_v4().to_string(),
            email: "ada@example.com".to_string(),
            host_id: ada.id.clone(),
        }),
    };
    assert!(matches!(
        store.create_activity(&dup),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn actor_equality_is_by_activity_id_only() {
    let env = env();
    let store = &env.store;

    let inviter = user(store, "host@example.com", None);
    let casper = ghost(store, "same@example.com", &inviter);

    let before = store.get_activity(&casper.id).unwrap().unwrap();
    store
        .promote_ghost(
            &casper.id,
            &User {
                id: Uuid::new_v4().to_string(),
                email: "same@example.com".to_string(),
                name: None,
                image: None,
                role: Role::User,
            },
        )
        .unwrap();
    let after = store.get_activity(&casper.id).unwrap().unwrap();

    // Same email, same actor before and after the merge
    assert_eq!(before.email(), after.email());
    assert_eq!(before.id, after.id);
    assert_ne!(before.kind(), after.kind());
}
