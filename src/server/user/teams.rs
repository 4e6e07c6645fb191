use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{OptionalActivity, RequireActivity};
use crate::server::AppState;
use crate::server::dto::{
    CompletionParams, CompletionView, CreateTeamRequest, GoalSearchRequest, GoalView,
    SetTeamParentRequest, SubscriptionRequest, TeamDetail, TeamProjectRequest, TeamView,
    UpdateTeamRequest,
};
use crate::server::response::{ApiError, ApiResponse, Page, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_title;
use crate::types::{GoalScope, TargetKind, Team};

use super::access::{displays, goal_view, resolve_actor, to_filter};

pub async fn create_team(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTeamRequest>,
) -> impl IntoResponse {
    validate_title(&req.title, "Team")?;

    let now = Utc::now();
    let team = Team {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        description: req.description,
        owner_id: auth.activity.id.clone(),
        parent_id: req.parent_id,
        created_at: now,
        updated_at: now,
    };

    // One transaction covers the team row, the parent link, and the
    // creator's watcher membership; a missing parent leaves nothing behind
    state
        .store
        .create_team(&team)
        .api_err("Parent team not found")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(TeamView {
            team,
            owner: auth.activity.display(),
        })),
    ))
}

pub async fn list_teams(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::success(Vec::<TeamView>::new())));
    }

    let store = state.store.as_ref();
    let teams = store.list_teams().api_err("Failed to list teams")?;

    let mut out = Vec::with_capacity(teams.len());
    for team in teams {
        let owner = resolve_actor(store, &team.owner_id)?;
        out.push(TeamView { team, owner });
    }

    Ok(Json(ApiResponse::success(out)))
}

pub async fn get_team(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::<TeamDetail>::null()));
    }

    let store = state.store.as_ref();
    let team = store
        .get_team(&id)
        .api_err("Failed to get team")?
        .or_not_found("Team not found")?;

    let owner = resolve_actor(store, &team.owner_id)?;
    let children = store
        .list_team_children(&team.id)
        .api_err("Failed to list team children")?;
    let projects = store
        .list_team_projects(&team.id)
        .api_err("Failed to list team projects")?;
    let watchers = store
        .list_watchers(TargetKind::Team, &team.id)
        .api_err("Failed to list watchers")?;
    let stargizers = store
        .list_stargizers(TargetKind::Team, &team.id)
        .api_err("Failed to list stargizers")?;

    Ok(Json(ApiResponse::success(TeamDetail {
        view: TeamView { team, owner },
        children,
        projects,
        watchers: displays(watchers),
        stargizers: displays(stargizers),
    })))
}

pub async fn update_team(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTeamRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut team = store
        .get_team(&id)
        .api_err("Failed to get team")?
        .or_not_found("Team not found")?;

    if let Some(title) = req.title {
        validate_title(&title, "Team")?;
        team.title = title;
    }
    if let Some(description) = req.description {
        team.description = Some(description);
    }

    store.update_team(&team).api_err("Failed to update team")?;

    let owner = resolve_actor(store, &team.owner_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(TeamView { team, owner })))
}

pub async fn set_team_parent(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetTeamParentRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .set_team_parent(&id, req.parent_id.as_deref())
        .api_err("Failed to set team parent")?;

    let team = store
        .get_team(&id)
        .api_err("Failed to get team")?
        .or_not_found("Team not found")?;
    let owner = resolve_actor(store, &team.owner_id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(TeamView { team, owner })))
}

pub async fn delete_team(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_team(&id)
        .api_err("Failed to delete team")?;

    if !deleted {
        return Err(ApiError::not_found("Team not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn add_team_project(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TeamProjectRequest>,
) -> impl IntoResponse {
    state
        .store
        .add_team_project(&id, &req.project_id)
        .api_err("Team or project not found")?;

    let projects = state
        .store
        .list_team_projects(&id)
        .api_err("Failed to list team projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn remove_team_project(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path((id, project_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let removed = state
        .store
        .remove_team_project(&id, &project_id)
        .api_err("Failed to remove team project")?;

    if !removed {
        return Err(ApiError::not_found("Project is not on the team"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn team_goals(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<GoalSearchRequest>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::<Page<GoalView>>::null()));
    }

    let store = state.store.as_ref();
    let team = store
        .get_team(&id)
        .api_err("Failed to get team")?
        .or_not_found("Team not found")?;

    let (goals, total_count) = store
        .search_goals(&GoalScope::Team(team.id), &to_filter(req))
        .api_err("Failed to search goals")?;

    let mut data = Vec::with_capacity(goals.len());
    for goal in goals {
        data.push(goal_view(store, goal)?);
    }

    Ok(Json(ApiResponse::success(Page { data, total_count })))
}

pub async fn teams_completion(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompletionParams>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::success(
            Vec::<CompletionView<Team>>::new(),
        )));
    }

    let store = state.store.as_ref();
    let teams = store
        .search_teams(
            params.query.as_deref().unwrap_or(""),
            params.sort.unwrap_or_default(),
        )
        .api_err("Failed to search teams")?;

    let mut out = Vec::with_capacity(teams.len());
    for team in teams {
        let owner = resolve_actor(store, &team.owner_id)?;
        let completion = store
            .team_completion(&team.id)
            .api_err("Failed to compute completion")?;
        out.push(CompletionView {
            item: team,
            owner,
            completion,
        });
    }

    Ok(Json(ApiResponse::success(out)))
}

async fn set_team_subscription(
    auth: RequireActivity,
    state: Arc<AppState>,
    id: String,
    desired: bool,
    star: bool,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    if star {
        store
            .set_stargizer(TargetKind::Team, &id, &auth.activity.id, desired)
            .api_err("Team not found")?;
    } else {
        store
            .set_watcher(TargetKind::Team, &id, &auth.activity.id, desired)
            .api_err("Team not found")?;
    }

    Ok(Json(ApiResponse::success(auth.activity.display())))
}

pub async fn watch_team(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    set_team_subscription(auth, state, id, req.desired, false).await
}

pub async fn star_team(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    set_team_subscription(auth, state, id, req.desired, true).await
}
