use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    ActorKind, DisplayActor, Goal, GoalRelations, GoalSort, Project, RelationKind, Session,
    SortOrder, State, Tag, Team,
};

// Admin surface

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<crate::types::Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Email of the registered identity the session speaks for.
    pub email: String,
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub token: String,
    pub session: Session,
}

// Identity

#[derive(Debug, Deserialize)]
pub struct InviteGhostRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FindActivitiesParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub kind: Option<ActorKind>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

// Flows

#[derive(Debug, Deserialize)]
pub struct CreateFlowRequest {
    pub title: String,
    pub states: Vec<FlowStateRequest>,
}

#[derive(Debug, Deserialize)]
pub struct FlowStateRequest {
    pub title: String,
    #[serde(default)]
    pub terminal: bool,
}

#[derive(Debug, Serialize)]
pub struct FlowResponse {
    #[serde(flatten)]
    pub flow: crate::types::Flow,
    pub states: Vec<State>,
}

// Tags

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub title: String,
}

// Projects

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub flow_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub owner: DisplayActor,
}

// Teams

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetTeamParentRequest {
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeamProjectRequest {
    pub project_id: String,
}

#[derive(Debug, Serialize)]
pub struct TeamView {
    #[serde(flatten)]
    pub team: Team,
    pub owner: DisplayActor,
}

#[derive(Debug, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub view: TeamView,
    pub children: Vec<Team>,
    pub projects: Vec<Project>,
    pub watchers: Vec<DisplayActor>,
    pub stargizers: Vec<DisplayActor>,
}

// Goals

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to the issuer when absent.
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub state_id: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub estimate: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub personal: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub participant_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGoalRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub estimate: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_key: Option<bool>,
    #[serde(default)]
    pub personal: Option<bool>,
    #[serde(default)]
    pub private: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetGoalStateRequest {
    pub state_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveGoalRequest {
    pub archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct LinkGoalsRequest {
    pub kind: RelationKind,
    pub target_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetGoalTagsRequest {
    pub tag_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetGoalParticipantsRequest {
    pub activity_ids: Vec<String>,
}

/// Desired end state of a watcher/stargizer membership, not a flip.
#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub desired: bool,
}

#[derive(Debug, Deserialize)]
pub struct GoalSearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub sort_by: Option<GoalSort>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Serialize)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: Goal,
    pub owner: DisplayActor,
    pub issuer: DisplayActor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub struct GoalDetail {
    #[serde(flatten)]
    pub view: GoalView,
    pub relations: GoalRelations,
    pub participants: Vec<DisplayActor>,
    pub watchers: Vec<DisplayActor>,
    pub stargizers: Vec<DisplayActor>,
}

// Completion

#[derive(Debug, Default, Deserialize)]
pub struct CompletionParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

/// A project or team with its owner projection and completion ratio.
/// `completion` is null (not zero) for collections without goals.
#[derive(Debug, Serialize)]
pub struct CompletionView<T: Serialize> {
    #[serde(flatten)]
    pub item: T,
    pub owner: DisplayActor,
    pub completion: Option<f64>,
}
