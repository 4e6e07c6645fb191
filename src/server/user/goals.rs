use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{OptionalActivity, RequireActivity};
use crate::server::AppState;
use crate::server::dto::{
    ArchiveGoalRequest, CreateGoalRequest, GoalDetail, LinkGoalsRequest, SetGoalParticipantsRequest,
    SetGoalStateRequest, SetGoalTagsRequest, SubscriptionRequest, UpdateGoalRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_title;
use crate::types::{Goal, RelationKind, TargetKind};

use super::access::{displays, goal_view, resolve_actor};

pub async fn create_goal(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGoalRequest>,
) -> impl IntoResponse {
    validate_title(&req.title, "Goal")?;

    let store = state.store.as_ref();

    let project = store
        .get_project(&req.project_id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    let owner_id = req.owner_id.unwrap_or_else(|| auth.activity.id.clone());
    resolve_actor(store, &owner_id)?;

    // Goals start in the flow's entry state unless one is named explicitly
    let state_id = match req.state_id {
        Some(state_id) => {
            let goal_state = store
                .get_state(&state_id)
                .api_err("Failed to get state")?
                .or_not_found("State not found")?;
            if goal_state.flow_id != project.flow_id {
                return Err(ApiError::bad_request(
                    "state does not belong to the project's flow",
                ));
            }
            Some(state_id)
        }
        None => store
            .list_flow_states(&project.flow_id)
            .api_err("Failed to list flow states")?
            .first()
            .map(|s| s.id.clone()),
    };

    let now = Utc::now();
    let goal = Goal {
        id: Uuid::new_v4().to_string(),
        project_id: project.id,
        title: req.title,
        description: req.description.unwrap_or_default(),
        owner_id,
        issuer_id: auth.activity.id.clone(),
        state_id,
        priority: req.priority.unwrap_or_else(|| "Medium".to_string()),
        estimate: req.estimate,
        is_key: req.is_key,
        personal: req.personal,
        private: req.private,
        archived: false,
        created_at: now,
        updated_at: now,
    };

    store
        .create_goal(&goal, &req.tag_ids, &req.participant_ids)
        .api_err("Failed to create goal")?;

    let view = goal_view(store, goal)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(view))))
}

pub async fn get_goal(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::<GoalDetail>::null()));
    }

    let store = state.store.as_ref();
    let goal = store
        .get_goal(&id)
        .api_err("Failed to get goal")?
        .or_not_found("Goal not found")?;

    let relations = store
        .goal_relations(&goal.id)
        .api_err("Failed to load relations")?;
    let participants = store
        .list_goal_participants(&goal.id)
        .api_err("Failed to list participants")?;
    let watchers = store
        .list_watchers(TargetKind::Goal, &goal.id)
        .api_err("Failed to list watchers")?;
    let stargizers = store
        .list_stargizers(TargetKind::Goal, &goal.id)
        .api_err("Failed to list stargizers")?;

    Ok(Json(ApiResponse::success(GoalDetail {
        view: goal_view(store, goal)?,
        relations,
        participants: displays(participants),
        watchers: displays(watchers),
        stargizers: displays(stargizers),
    })))
}

pub async fn update_goal(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateGoalRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut goal = store
        .get_goal(&id)
        .api_err("Failed to get goal")?
        .or_not_found("Goal not found")?;

    if let Some(title) = req.title {
        validate_title(&title, "Goal")?;
        goal.title = title;
    }
    if let Some(description) = req.description {
        goal.description = description;
    }
    if let Some(owner_id) = req.owner_id {
        resolve_actor(store, &owner_id)?;
        goal.owner_id = owner_id;
    }
    if let Some(priority) = req.priority {
        goal.priority = priority;
    }
    if let Some(estimate) = req.estimate {
        goal.estimate = Some(estimate);
    }
    if let Some(is_key) = req.is_key {
        goal.is_key = is_key;
    }
    if let Some(personal) = req.personal {
        goal.personal = personal;
    }
    if let Some(private) = req.private {
        goal.private = private;
    }

    store.update_goal(&goal).api_err("Failed to update goal")?;

    let view = goal_view(store, goal)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(view)))
}

pub async fn set_goal_state(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetGoalStateRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .set_goal_state(&id, &req.state_id)
        .api_err("Goal or state not found")?;

    let goal = store
        .get_goal(&id)
        .api_err("Failed to get goal")?
        .or_not_found("Goal not found")?;
    let view = goal_view(store, goal)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(view)))
}

pub async fn set_goal_archived(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ArchiveGoalRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .set_goal_archived(&id, req.archived)
        .api_err("Goal not found")?;

    let goal = store
        .get_goal(&id)
        .api_err("Failed to get goal")?
        .or_not_found("Goal not found")?;
    let view = goal_view(store, goal)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(view)))
}

pub async fn delete_goal(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_goal(&id, state.delete_policy)
        .api_err("Failed to delete goal")?;

    if !deleted {
        return Err(ApiError::not_found("Goal not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn link_goals(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<LinkGoalsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .link_goals(req.kind, &id, &req.target_id)
        .api_err("Goal not found")?;

    let relations = store
        .goal_relations(&id)
        .api_err("Failed to load relations")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(relations)))
}

pub async fn unlink_goals(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path((id, kind, target_id)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let kind = RelationKind::parse(&kind)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown relation kind '{kind}'")))?;

    let store = state.store.as_ref();

    store
        .unlink_goals(kind, &id, &target_id)
        .api_err("Relation not found")?;

    let relations = store
        .goal_relations(&id)
        .api_err("Failed to load relations")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(relations)))
}

pub async fn set_goal_tags(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetGoalTagsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .set_goal_tags(&id, &req.tag_ids)
        .api_err("Goal or tag not found")?;

    let tags = store
        .list_goal_tags(&id)
        .api_err("Failed to list goal tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn set_goal_participants(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetGoalParticipantsRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .set_goal_participants(&id, &req.activity_ids)
        .api_err("Goal or activity not found")?;

    let participants = store
        .list_goal_participants(&id)
        .api_err("Failed to list participants")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(displays(participants))))
}

async fn set_goal_subscription(
    auth: RequireActivity,
    state: Arc<AppState>,
    id: String,
    desired: bool,
    star: bool,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    if star {
        store
            .set_stargizer(TargetKind::Goal, &id, &auth.activity.id, desired)
            .api_err("Goal not found")?;
    } else {
        store
            .set_watcher(TargetKind::Goal, &id, &auth.activity.id, desired)
            .api_err("Goal not found")?;
    }

    Ok(Json(ApiResponse::success(auth.activity.display())))
}

pub async fn watch_goal(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    set_goal_subscription(auth, state, id, req.desired, false).await
}

pub async fn star_goal(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    set_goal_subscription(auth, state, id, req.desired, true).await
}
