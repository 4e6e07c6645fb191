mod common;

use northstar::error::Error;
use northstar::store::Store;
use northstar::types::{DeletePolicy, RelationKind};

use common::{env, flow, goal, project, user};

#[test]
fn blocks_edge_appears_as_depends_on_inverse() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", Some("Ada"));
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);
    let g2 = goal(store, &proj, "G2", &ada, None);

    store
        .link_goals(RelationKind::Blocks, &g1.id, &g2.id)
        .unwrap();

    let g1_rel = store.goal_relations(&g1.id).unwrap();
    assert_eq!(g1_rel.blocks.len(), 1);
    assert_eq!(g1_rel.blocks[0].id, g2.id);
    assert!(g1_rel.depends_on.is_empty());

    let g2_rel = store.goal_relations(&g2.id).unwrap();
    assert_eq!(g2_rel.depends_on.len(), 1);
    assert_eq!(g2_rel.depends_on[0].id, g1.id);
    assert!(g2_rel.blocks.is_empty());

    // Unlinking removes both views at once
    store
        .unlink_goals(RelationKind::Blocks, &g1.id, &g2.id)
        .unwrap();
    assert!(store.goal_relations(&g1.id).unwrap().blocks.is_empty());
    assert!(store.goal_relations(&g2.id).unwrap().depends_on.is_empty());
}

#[test]
fn depends_on_writes_the_inverse_blocks_edge() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);
    let g2 = goal(store, &proj, "G2", &ada, None);

    // "G2 depends on G1" is the same stored edge as "G1 blocks G2"
    store
        .link_goals(RelationKind::DependsOn, &g2.id, &g1.id)
        .unwrap();

    let g1_rel = store.goal_relations(&g1.id).unwrap();
    assert_eq!(g1_rel.blocks.len(), 1);
    assert_eq!(g1_rel.blocks[0].id, g2.id);

    // The edge and its inverse are one record: linking the blocks side
    // now is a duplicate, not a second row
    let result = store.link_goals(RelationKind::Blocks, &g1.id, &g2.id);
    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[test]
fn symmetric_relations_read_the_same_from_both_ends() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);
    let g2 = goal(store, &proj, "G2", &ada, None);

    store
        .link_goals(RelationKind::RelatedTo, &g2.id, &g1.id)
        .unwrap();

    let g1_rel = store.goal_relations(&g1.id).unwrap();
    let g2_rel = store.goal_relations(&g2.id).unwrap();
    assert_eq!(g1_rel.related_to.len(), 1);
    assert_eq!(g1_rel.related_to[0].id, g2.id);
    assert_eq!(g2_rel.related_to.len(), 1);
    assert_eq!(g2_rel.related_to[0].id, g1.id);

    // A duplicate insert is rejected under either argument order
    let result = store.link_goals(RelationKind::RelatedTo, &g1.id, &g2.id);
    assert!(matches!(result, Err(Error::Conflict(_))));
    let result = store.link_goals(RelationKind::RelatedTo, &g2.id, &g1.id);
    assert!(matches!(result, Err(Error::Conflict(_))));

    // Unlinking works from the opposite end it was linked from
    store
        .unlink_goals(RelationKind::RelatedTo, &g1.id, &g2.id)
        .unwrap();
    assert!(store.goal_relations(&g2.id).unwrap().related_to.is_empty());
}

#[test]
fn self_edges_fail_invalid_relation_for_every_kind() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);

    for kind in [
        RelationKind::Blocks,
        RelationKind::DependsOn,
        RelationKind::RelatedTo,
        RelationKind::Connected,
    ] {
        let result = store.link_goals(kind, &g1.id, &g1.id);
        assert!(matches!(result, Err(Error::InvalidRelation(_))));
    }
}

#[test]
fn linking_missing_goals_is_not_found() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);

    let result = store.link_goals(RelationKind::Blocks, &g1.id, "nope");
    assert!(matches!(result, Err(Error::NotFound)));
    let result = store.link_goals(RelationKind::Blocks, "nope", &g1.id);
    assert!(matches!(result, Err(Error::NotFound)));
}

#[test]
fn unlinking_a_missing_edge_is_not_found() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);
    let g2 = goal(store, &proj, "G2", &ada, None);

    let result = store.unlink_goals(RelationKind::Connected, &g1.id, &g2.id);
    assert!(matches!(result, Err(Error::NotFound)));
}

#[test]
fn delete_with_dependents_blocks_under_strict_policy() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);
    let g2 = goal(store, &proj, "G2", &ada, None);

    store
        .link_goals(RelationKind::Blocks, &g1.id, &g2.id)
        .unwrap();

    let result = store.delete_goal(&g2.id, DeletePolicy::Block);
    assert!(matches!(result, Err(Error::DependencyExists)));

    // Goal and edge both survive the refused delete
    assert!(store.get_goal(&g2.id).unwrap().is_some());
    assert_eq!(store.goal_relations(&g1.id).unwrap().blocks.len(), 1);
}

#[test]
fn delete_with_dependents_cascades_under_cascade_policy() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);
    let g2 = goal(store, &proj, "G2", &ada, None);

    store
        .link_goals(RelationKind::Blocks, &g1.id, &g2.id)
        .unwrap();

    assert!(store.delete_goal(&g2.id, DeletePolicy::Cascade).unwrap());

    assert!(store.get_goal(&g2.id).unwrap().is_none());
    assert!(store.goal_relations(&g1.id).unwrap().blocks.is_empty());
    assert!(!store.has_relations(&g1.id).unwrap());
}

#[test]
fn deleting_a_missing_goal_reports_false() {
    let env = env();
    let store = &env.store;

    assert!(!store.delete_goal("nope", DeletePolicy::Block).unwrap());
}

#[test]
fn archived_goals_keep_their_edges() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);
    let g2 = goal(store, &proj, "G2", &ada, None);

    store
        .link_goals(RelationKind::Connected, &g1.id, &g2.id)
        .unwrap();
    store.set_goal_archived(&g2.id, true).unwrap();

    // Soft delete leaves referential integrity intact
    let g1_rel = store.goal_relations(&g1.id).unwrap();
    assert_eq!(g1_rel.connected.len(), 1);
    assert_eq!(g1_rel.connected[0].id, g2.id);
    assert!(g1_rel.connected[0].archived);
}
