mod common;

use northstar::store::Store;

use common::{env, flow, goal, project, team, user};

#[test]
fn zero_goal_collections_report_null_completion() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let tm = team(store, "Platform", &ada);
    store.add_team_project(&tm.id, &proj.id).unwrap();

    assert_eq!(store.project_completion(&proj.id).unwrap(), None);
    assert_eq!(store.team_completion(&tm.id).unwrap(), None);
}

#[test]
fn completion_is_terminal_share_of_non_archived_goals() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, states) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let backlog = &states[0];
    let done = &states[2];

    goal(store, &proj, "open one", &ada, Some(&backlog.id));
    goal(store, &proj, "open two", &ada, Some(&backlog.id));
    goal(store, &proj, "done one", &ada, Some(&done.id));
    goal(store, &proj, "done two", &ada, Some(&done.id));

    assert_eq!(store.project_completion(&proj.id).unwrap(), Some(0.5));
}

#[test]
fn archiving_goals_moves_the_ratio_and_can_empty_it() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, states) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let done = &states[2];

    let g1 = goal(store, &proj, "open", &ada, Some(&states[0].id));
    let g2 = goal(store, &proj, "done", &ada, Some(&done.id));

    assert_eq!(store.project_completion(&proj.id).unwrap(), Some(0.5));

    store.set_goal_archived(&g1.id, true).unwrap();
    assert_eq!(store.project_completion(&proj.id).unwrap(), Some(1.0));

    // Archiving everything leaves an undefined ratio, not zero
    store.set_goal_archived(&g2.id, true).unwrap();
    assert_eq!(store.project_completion(&proj.id).unwrap(), None);
}

#[test]
fn stateless_goals_count_as_not_done() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, states) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);

    goal(store, &proj, "no state yet", &ada, None);
    goal(store, &proj, "done", &ada, Some(&states[2].id));

    assert_eq!(store.project_completion(&proj.id).unwrap(), Some(0.5));
}

#[test]
fn team_completion_aggregates_member_projects() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, states) = flow(store);
    let p1 = project(store, "ONE", &fl, &ada);
    let p2 = project(store, "TWO", &fl, &ada);
    let outside = project(store, "OUT", &fl, &ada);
    let tm = team(store, "Platform", &ada);

    store.add_team_project(&tm.id, &p1.id).unwrap();
    store.add_team_project(&tm.id, &p2.id).unwrap();

    let done = &states[2];
    goal(store, &p1, "done", &ada, Some(&done.id));
    goal(store, &p2, "open", &ada, Some(&states[0].id));
    goal(store, &p2, "open too", &ada, Some(&states[0].id));
    // Goals outside the team never count
    goal(store, &outside, "done elsewhere", &ada, Some(&done.id));

    let completion = store.team_completion(&tm.id).unwrap().unwrap();
    assert!((completion - 1.0 / 3.0).abs() < f64::EPSILON);
}
