mod common;

use northstar::error::Error;
use northstar::store::Store;
use northstar::types::TargetKind;

use common::{env, flow, goal, project, team, user};

#[test]
fn watcher_set_is_idempotent_in_both_directions() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let g1 = goal(store, &proj, "G1", &ada, None);

    // Setting the same desired state twice leaves exactly one record
    store
        .set_watcher(TargetKind::Goal, &g1.id, &ada.id, true)
        .unwrap();
    store
        .set_watcher(TargetKind::Goal, &g1.id, &ada.id, true)
        .unwrap();

    let watchers = store.list_watchers(TargetKind::Goal, &g1.id).unwrap();
    assert_eq!(watchers.len(), 1);
    assert_eq!(watchers[0].id, ada.id);

    // Clearing a non-member succeeds with no state change
    store
        .set_watcher(TargetKind::Goal, &g1.id, &ada.id, false)
        .unwrap();
    store
        .set_watcher(TargetKind::Goal, &g1.id, &ada.id, false)
        .unwrap();
    assert!(store.list_watchers(TargetKind::Goal, &g1.id).unwrap().is_empty());
}

#[test]
fn stargizers_apply_uniformly_to_projects_and_teams() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let grace = user(store, "grace@example.com", Some("Grace"));
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let tm = team(store, "Platform", &ada);

    store
        .set_stargizer(TargetKind::Project, &proj.id, &grace.id, true)
        .unwrap();
    store
        .set_stargizer(TargetKind::Team, &tm.id, &grace.id, true)
        .unwrap();

    let proj_stars = store.list_stargizers(TargetKind::Project, &proj.id).unwrap();
    assert_eq!(proj_stars.len(), 1);
    assert_eq!(proj_stars[0].display().label(), "Grace");

    let team_stars = store.list_stargizers(TargetKind::Team, &tm.id).unwrap();
    assert_eq!(team_stars.len(), 1);

    // Watchers and stargizers are independent sets
    assert!(store.list_watchers(TargetKind::Project, &proj.id).unwrap().is_empty());
}

#[test]
fn membership_on_a_missing_target_is_not_found() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);

    let result = store.set_watcher(TargetKind::Goal, "nope", &ada.id, true);
    assert!(matches!(result, Err(Error::NotFound)));

    let result = store.set_stargizer(TargetKind::Team, "nope", &ada.id, false);
    assert!(matches!(result, Err(Error::NotFound)));
}

#[test]
fn membership_for_a_missing_activity_is_not_found() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);

    let result = store.set_watcher(TargetKind::Project, &proj.id, "nope", true);
    assert!(matches!(result, Err(Error::NotFound)));
}

#[test]
fn ghosts_can_watch_too() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let casper = common::ghost(store, "casper@example.com", &ada);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);

    store
        .set_watcher(TargetKind::Project, &proj.id, &casper.id, true)
        .unwrap();

    let watchers = store.list_watchers(TargetKind::Project, &proj.id).unwrap();
    assert_eq!(watchers.len(), 1);
    assert_eq!(watchers[0].display().label(), "casper@example.com");
}
