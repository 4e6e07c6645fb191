use crate::server::dto::{GoalSearchRequest, GoalView};
use crate::server::response::{ApiError, DEFAULT_PAGE_SIZE, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Activity, DisplayActor, Goal, GoalFilter};

/// Resolves an activity id to its display projection. Total over valid
/// ids; a dangling reference is a store-level defect surfaced as 404.
pub fn resolve_actor(store: &dyn Store, activity_id: &str) -> Result<DisplayActor, ApiError> {
    let activity = store
        .get_activity(activity_id)
        .api_err("Failed to resolve activity")?
        .or_not_found("Activity not found")?;
    Ok(activity.display())
}

pub fn displays(activities: Vec<Activity>) -> Vec<DisplayActor> {
    activities.iter().map(Activity::display).collect()
}

/// Hangs the resolved owner/issuer, state, and tag set off a goal row.
pub fn goal_view(store: &dyn Store, goal: Goal) -> Result<GoalView, ApiError> {
    let owner = resolve_actor(store, &goal.owner_id)?;
    let issuer = resolve_actor(store, &goal.issuer_id)?;
    let state = match &goal.state_id {
        Some(state_id) => store.get_state(state_id).api_err("Failed to load state")?,
        None => None,
    };
    let tags = store
        .list_goal_tags(&goal.id)
        .api_err("Failed to load goal tags")?;

    Ok(GoalView {
        goal,
        owner,
        issuer,
        state,
        tags,
    })
}

pub fn to_filter(req: GoalSearchRequest) -> GoalFilter {
    GoalFilter {
        query: req.query,
        states: req.states,
        tags: req.tags,
        owners: req.owners,
        page_size: req.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        offset: req.offset.unwrap_or(0),
        sort_by: req.sort_by.unwrap_or_default(),
        sort: req.sort.unwrap_or_default(),
    }
}
