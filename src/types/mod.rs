mod identity;
mod models;
mod query;
mod relation;

pub use identity::{Actor, ActorKind, DisplayActor};
pub use models::{
    Activity, DeletePolicy, Flow, Ghost, Goal, Project, Role, Session, State, Tag, Team, User,
};
pub use query::{GoalFilter, GoalScope, GoalSort, SortOrder, TargetKind};
pub use relation::{GoalRelations, RelationKind, StoredEdge, StoredKind};
