#![allow(dead_code)]

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use northstar::store::{SqliteStore, Store};
use northstar::types::*;

pub struct TestEnv {
    pub store: SqliteStore,
    _temp: TempDir,
}

pub fn env() -> TestEnv {
    let temp = TempDir::new().expect("create temp dir");
    let store = SqliteStore::new(temp.path().join("northstar.db")).expect("open store");
    store.initialize().expect("initialize schema");
    TestEnv { store, _temp: temp }
}

pub fn user(store: &SqliteStore, email: &str, name: Option<&str>) -> Activity {
    let now = Utc::now();
    let activity = Activity {
        id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
        actor: Actor::User(User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            image: None,
            role: Role::User,
        }),
    };
    store.create_activity(&activity).expect("create user activity");
    activity
}

pub fn ghost(store: &SqliteStore, email: &str, host: &Activity) -> Activity {
    let now = Utc::now();
    let activity = Activity {
        id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
        actor: Actor::Ghost(Ghost {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            host_id: host.id.clone(),
        }),
    };
    store.create_activity(&activity).expect("create ghost activity");
    activity
}

/// Backlog (entry) → In Progress → Done (terminal).
pub fn flow(store: &SqliteStore) -> (Flow, Vec<State>) {
    let flow = Flow {
        id: Uuid::new_v4().to_string(),
        title: "Default".to_string(),
        created_at: Utc::now(),
    };
    let states: Vec<State> = [("Backlog", false), ("In Progress", false), ("Done", true)]
        .iter()
        .enumerate()
        .map(|(position, (title, terminal))| State {
            id: Uuid::new_v4().to_string(),
            flow_id: flow.id.clone(),
            title: (*title).to_string(),
            position: position as i32,
            terminal: *terminal,
        })
        .collect();
    store.create_flow(&flow, &states).expect("create flow");
    (flow, states)
}

pub fn project(store: &SqliteStore, key: &str, flow: &Flow, owner: &Activity) -> Project {
    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        key: key.to_string(),
        title: format!("Project {key}"),
        description: None,
        flow_id: flow.id.clone(),
        owner_id: owner.id.clone(),
        created_at: now,
        updated_at: now,
    };
    store.create_project(&project).expect("create project");
    project
}

pub fn team(store: &SqliteStore, title: &str, owner: &Activity) -> Team {
    let now = Utc::now();
    let team = Team {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: None,
        owner_id: owner.id.clone(),
        parent_id: None,
        created_at: now,
        updated_at: now,
    };
    store.create_team(&team).expect("create team");
    team
}

pub fn goal(
    store: &SqliteStore,
    project: &Project,
    title: &str,
    owner: &Activity,
    state_id: Option<&str>,
) -> Goal {
    goal_with_description(store, project, title, "", owner, state_id)
}

pub fn goal_with_description(
    store: &SqliteStore,
    project: &Project,
    title: &str,
    description: &str,
    owner: &Activity,
    state_id: Option<&str>,
) -> Goal {
    let now = Utc::now();
    let goal = Goal {
        id: Uuid::new_v4().to_string(),
        project_id: project.id.clone(),
        title: title.to_string(),
        description: description.to_string(),
        owner_id: owner.id.clone(),
        issuer_id: owner.id.clone(),
        state_id: state_id.map(str::to_string),
        priority: "Medium".to_string(),
        estimate: None,
        is_key: false,
        personal: false,
        private: false,
        archived: false,
        created_at: now,
        updated_at: now,
    };
    store.create_goal(&goal, &[], &[]).expect("create goal");
    goal
}

/// Filter with the given text query and defaults everywhere else.
pub fn filter(query: &str) -> GoalFilter {
    GoalFilter {
        query: query.to_string(),
        ..GoalFilter::default()
    }
}
