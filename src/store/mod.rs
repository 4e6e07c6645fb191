mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface. Every multi-row mutation runs as
/// one transaction; validation failures never leave partial writes.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Activity operations (identity resolution)
    fn create_activity(&self, activity: &Activity) -> Result<()>;
    fn get_activity(&self, id: &str) -> Result<Option<Activity>>;
    fn get_activity_by_email(&self, email: &str) -> Result<Option<Activity>>;
    fn find_activities(
        &self,
        query: &str,
        kind: Option<ActorKind>,
        sort: SortOrder,
    ) -> Result<Vec<Activity>>;
    /// Replaces a ghost with a registered user in place, preserving the
    /// activity id so every edge and membership row stays valid.
    fn promote_ghost(&self, activity_id: &str, user: &User) -> Result<Activity>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn list_sessions(&self) -> Result<Vec<Session>>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn update_session_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_session(&self) -> Result<bool>;

    // Flow operations
    fn create_flow(&self, flow: &Flow, states: &[State]) -> Result<()>;
    fn get_flow(&self, id: &str) -> Result<Option<Flow>>;
    fn list_flows(&self) -> Result<Vec<Flow>>;
    fn list_flow_states(&self, flow_id: &str) -> Result<Vec<State>>;
    fn get_state(&self, id: &str) -> Result<Option<State>>;

    // Tag operations
    fn create_tag(&self, tag: &Tag) -> Result<()>;
    fn get_tag(&self, id: &str) -> Result<Option<Tag>>;
    fn list_tags(&self) -> Result<Vec<Tag>>;

    // Project operations
    fn create_project(&self, project: &Project) -> Result<()>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn get_project_by_key(&self, key: &str) -> Result<Option<Project>>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn update_project(&self, project: &Project) -> Result<()>;
    fn delete_project(&self, id: &str) -> Result<bool>;

    // Team operations (parent/children form a forest)
    fn create_team(&self, team: &Team) -> Result<()>;
    fn get_team(&self, id: &str) -> Result<Option<Team>>;
    fn list_teams(&self) -> Result<Vec<Team>>;
    fn list_team_children(&self, id: &str) -> Result<Vec<Team>>;
    fn update_team(&self, team: &Team) -> Result<()>;
    fn set_team_parent(&self, id: &str, parent_id: Option<&str>) -> Result<()>;
    fn delete_team(&self, id: &str) -> Result<bool>;

    // Team-Project M2M operations
    fn add_team_project(&self, team_id: &str, project_id: &str) -> Result<()>;
    fn remove_team_project(&self, team_id: &str, project_id: &str) -> Result<bool>;
    fn list_team_projects(&self, team_id: &str) -> Result<Vec<Project>>;

    // Goal operations
    fn create_goal(&self, goal: &Goal, tags: &[String], participants: &[String]) -> Result<()>;
    fn get_goal(&self, id: &str) -> Result<Option<Goal>>;
    fn update_goal(&self, goal: &Goal) -> Result<()>;
    fn set_goal_state(&self, goal_id: &str, state_id: &str) -> Result<()>;
    fn set_goal_archived(&self, id: &str, archived: bool) -> Result<()>;
    fn delete_goal(&self, id: &str, policy: DeletePolicy) -> Result<bool>;
    fn set_goal_tags(&self, goal_id: &str, tag_ids: &[String]) -> Result<()>;
    fn list_goal_tags(&self, goal_id: &str) -> Result<Vec<Tag>>;
    fn set_goal_participants(&self, goal_id: &str, activity_ids: &[String]) -> Result<()>;
    fn list_goal_participants(&self, goal_id: &str) -> Result<Vec<Activity>>;

    // Goal relation operations
    fn link_goals(&self, kind: RelationKind, from_id: &str, to_id: &str) -> Result<()>;
    fn unlink_goals(&self, kind: RelationKind, from_id: &str, to_id: &str) -> Result<()>;
    fn goal_relations(&self, id: &str) -> Result<GoalRelations>;
    fn has_relations(&self, id: &str) -> Result<bool>;

    // Watcher/stargizer membership. `desired` is the end state, not a
    // flip: repeated calls are idempotent.
    fn set_watcher(
        &self,
        kind: TargetKind,
        target_id: &str,
        activity_id: &str,
        desired: bool,
    ) -> Result<()>;
    fn set_stargizer(
        &self,
        kind: TargetKind,
        target_id: &str,
        activity_id: &str,
        desired: bool,
    ) -> Result<()>;
    fn list_watchers(&self, kind: TargetKind, target_id: &str) -> Result<Vec<Activity>>;
    fn list_stargizers(&self, kind: TargetKind, target_id: &str) -> Result<Vec<Activity>>;

    // Search and completion
    fn search_goals(&self, scope: &GoalScope, filter: &GoalFilter) -> Result<(Vec<Goal>, i64)>;
    fn search_projects(&self, query: &str, sort: SortOrder) -> Result<Vec<Project>>;
    fn search_teams(&self, query: &str, sort: SortOrder) -> Result<Vec<Team>>;
    /// Terminal-state share of non-archived goals; None when there are no
    /// non-archived goals at all.
    fn project_completion(&self, project_id: &str) -> Result<Option<f64>>;
    fn team_completion(&self, team_id: &str) -> Result<Option<f64>>;

    fn close(&self) -> Result<()>;
}
