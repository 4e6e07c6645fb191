mod common;

use northstar::store::Store;
use northstar::types::{GoalFilter, GoalScope, GoalSort, SortOrder};

use common::{env, filter, flow, goal, goal_with_description, project, team, user};

#[test]
fn empty_query_returns_an_empty_page_for_any_filters() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, states) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    goal(store, &proj, "Ship the parser", &ada, Some(&states[0].id));

    let scope = GoalScope::Project(proj.id.clone());

    let (page, total) = store.search_goals(&scope, &filter("")).unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 0);

    // Still empty with facets set; empty text is not "no filter"
    let with_facets = GoalFilter {
        query: String::new(),
        states: vec![states[0].id.clone()],
        owners: vec![ada.id.clone()],
        ..GoalFilter::default()
    };
    let (page, total) = store.search_goals(&scope, &with_facets).unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 0);
}

#[test]
fn text_match_is_case_insensitive_over_title_or_description() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);

    goal(store, &proj, "Ship the Parser", &ada, None);
    goal_with_description(store, &proj, "Cleanup", "parser refactor leftovers", &ada, None);
    goal(store, &proj, "Unrelated", &ada, None);

    let scope = GoalScope::Project(proj.id.clone());
    let (page, total) = store.search_goals(&scope, &filter("PARSER")).unwrap();

    assert_eq!(total, 2);
    let titles: Vec<&str> = page.iter().map(|g| g.title.as_str()).collect();
    assert!(titles.contains(&"Ship the Parser"));
    assert!(titles.contains(&"Cleanup"));
}

#[test]
fn facets_are_or_within_and_and_across() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let grace = user(store, "grace@example.com", None);
    let (fl, states) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);
    let backlog = &states[0];
    let doing = &states[1];
    let done = &states[2];

    // All titles share "task" so the text filter keeps everything
    let g1 = goal(store, &proj, "task one", &ada, Some(&backlog.id));
    goal(store, &proj, "task two", &ada, Some(&done.id));
    let g3 = goal(store, &proj, "task three", &grace, Some(&doing.id));

    let scope = GoalScope::Project(proj.id.clone());

    // states OR-within: backlog or doing
    let two_states = GoalFilter {
        query: "task".to_string(),
        states: vec![backlog.id.clone(), doing.id.clone()],
        ..GoalFilter::default()
    };
    let (page, total) = store.search_goals(&scope, &two_states).unwrap();
    assert_eq!(total, 2);
    let ids: Vec<&str> = page.iter().map(|g| g.id.as_str()).collect();
    assert!(ids.contains(&g1.id.as_str()));
    assert!(ids.contains(&g3.id.as_str()));

    // AND-across: (backlog ∨ doing) ∧ owner=grace leaves one
    let with_owner = GoalFilter {
        owners: vec![grace.id.clone()],
        ..two_states
    };
    let (page, total) = store.search_goals(&scope, &with_owner).unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].id, g3.id);
}

#[test]
fn tag_facet_selects_goals_carrying_any_listed_tag() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);

    let now = chrono::Utc::now();
    let tag = northstar::types::Tag {
        id: uuid::Uuid::new_v4().to_string(),
        title: "infra".to_string(),
        created_at: now,
    };
    store.create_tag(&tag).unwrap();

    let g1 = goal(store, &proj, "task one", &ada, None);
    goal(store, &proj, "task two", &ada, None);
    store.set_goal_tags(&g1.id, &[tag.id.clone()]).unwrap();

    let scope = GoalScope::Project(proj.id.clone());
    let tagged = GoalFilter {
        query: "task".to_string(),
        tags: vec![tag.id.clone()],
        ..GoalFilter::default()
    };
    let (page, total) = store.search_goals(&scope, &tagged).unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].id, g1.id);
}

#[test]
fn pages_never_exceed_page_size_and_total_is_independent() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);

    for i in 0..7 {
        goal(store, &proj, &format!("task {i}"), &ada, None);
    }

    let scope = GoalScope::Project(proj.id.clone());

    let mut seen = Vec::new();
    for page_index in 0..3 {
        let paged = GoalFilter {
            query: "task".to_string(),
            page_size: 3,
            offset: page_index * 3,
            sort_by: GoalSort::Title,
            ..GoalFilter::default()
        };
        let (page, total) = store.search_goals(&scope, &paged).unwrap();
        assert_eq!(total, 7);
        assert!(page.len() <= 3);
        seen.extend(page.into_iter().map(|g| g.id));
    }

    // Offset pagination walked the full set exactly once
    assert_eq!(seen.len(), 7);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 7);
}

#[test]
fn ordering_is_stable_with_id_tiebreak() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);

    // Identical titles force the tiebreak to decide
    for _ in 0..5 {
        goal(store, &proj, "same title", &ada, None);
    }

    let scope = GoalScope::Project(proj.id.clone());
    let by_title = GoalFilter {
        query: "same".to_string(),
        sort_by: GoalSort::Title,
        sort: SortOrder::Asc,
        ..GoalFilter::default()
    };

    let (first, _) = store.search_goals(&scope, &by_title).unwrap();
    let (second, _) = store.search_goals(&scope, &by_title).unwrap();
    let first_ids: Vec<&str> = first.iter().map(|g| g.id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);

    let mut sorted = first_ids.clone();
    sorted.sort();
    assert_eq!(first_ids, sorted);
}

#[test]
fn archived_goals_are_excluded_from_search() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let proj = project(store, "PROJ", &fl, &ada);

    let g1 = goal(store, &proj, "task one", &ada, None);
    goal(store, &proj, "task two", &ada, None);
    store.set_goal_archived(&g1.id, true).unwrap();

    let scope = GoalScope::Project(proj.id.clone());
    let (page, total) = store.search_goals(&scope, &filter("task")).unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].title, "task two");
}

#[test]
fn team_scope_spans_member_projects() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    let p1 = project(store, "ONE", &fl, &ada);
    let p2 = project(store, "TWO", &fl, &ada);
    let p3 = project(store, "THREE", &fl, &ada);
    let tm = team(store, "Platform", &ada);

    store.add_team_project(&tm.id, &p1.id).unwrap();
    store.add_team_project(&tm.id, &p2.id).unwrap();

    goal(store, &p1, "task in one", &ada, None);
    goal(store, &p2, "task in two", &ada, None);
    goal(store, &p3, "task outside", &ada, None);

    let (page, total) = store
        .search_goals(&GoalScope::Team(tm.id.clone()), &filter("task"))
        .unwrap();
    assert_eq!(total, 2);
    assert!(page.iter().all(|g| g.project_id != p3.id));
}

#[test]
fn project_and_team_title_search_shortcircuits_on_empty() {
    let env = env();
    let store = &env.store;

    let ada = user(store, "ada@example.com", None);
    let (fl, _) = flow(store);
    project(store, "PROJ", &fl, &ada);
    team(store, "Platform", &ada);

    assert!(store.search_projects("", SortOrder::Asc).unwrap().is_empty());
    assert!(store.search_teams("", SortOrder::Asc).unwrap().is_empty());

    assert_eq!(store.search_projects("proj", SortOrder::Asc).unwrap().len(), 1);
    assert_eq!(store.search_teams("PLAT", SortOrder::Asc).unwrap().len(), 1);
}
