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
    CompletionParams, CompletionView, CreateProjectRequest, GoalSearchRequest, GoalView,
    ProjectView, SubscriptionRequest, UpdateProjectRequest,
};
use crate::server::response::{ApiError, ApiResponse, Page, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_project_key, validate_title};
use crate::types::{GoalScope, Project, TargetKind};

use super::access::{goal_view, resolve_actor, to_filter};

pub async fn create_project(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    validate_project_key(&req.key)?;
    validate_title(&req.title, "Project")?;

    let store = state.store.as_ref();

    store
        .get_flow(&req.flow_id)
        .api_err("Failed to check flow")?
        .or_not_found("Flow not found")?;

    if store
        .get_project_by_key(&req.key)
        .api_err("Failed to check project key")?
        .is_some()
    {
        return Err(ApiError::conflict("Project key already exists"));
    }

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        key: req.key,
        title: req.title,
        description: req.description,
        flow_id: req.flow_id,
        owner_id: auth.activity.id.clone(),
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_project(&project)
        .api_err("Failed to create project")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(ProjectView {
            project,
            owner: auth.activity.display(),
        })),
    ))
}

pub async fn list_projects(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::success(Vec::<ProjectView>::new())));
    }

    let store = state.store.as_ref();
    let projects = store.list_projects().api_err("Failed to list projects")?;

    let mut out = Vec::with_capacity(projects.len());
    for project in projects {
        let owner = resolve_actor(store, &project.owner_id)?;
        out.push(ProjectView { project, owner });
    }

    Ok(Json(ApiResponse::success(out)))
}

pub async fn get_project(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::<ProjectView>::null()));
    }

    let store = state.store.as_ref();
    let project = store
        .get_project_by_key(&key)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    let owner = resolve_actor(store, &project.owner_id)?;
    Ok(Json(ApiResponse::success(ProjectView { project, owner })))
}

pub async fn update_project(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut project = store
        .get_project_by_key(&key)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    if let Some(title) = req.title {
        validate_title(&title, "Project")?;
        project.title = title;
    }
    if let Some(description) = req.description {
        project.description = Some(description);
    }

    store
        .update_project(&project)
        .api_err("Failed to update project")?;

    let owner = resolve_actor(store, &project.owner_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(ProjectView { project, owner })))
}

pub async fn delete_project(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let project = store
        .get_project_by_key(&key)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    store
        .delete_project(&project.id)
        .api_err("Failed to delete project")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn project_goals(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<GoalSearchRequest>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::<Page<GoalView>>::null()));
    }

    let store = state.store.as_ref();
    let project = store
        .get_project_by_key(&key)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    let (goals, total_count) = store
        .search_goals(&GoalScope::Project(project.id), &to_filter(req))
        .api_err("Failed to search goals")?;

    let mut data = Vec::with_capacity(goals.len());
    for goal in goals {
        data.push(goal_view(store, goal)?);
    }

    Ok(Json(ApiResponse::success(Page { data, total_count })))
}

pub async fn projects_completion(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompletionParams>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::success(
            Vec::<CompletionView<Project>>::new(),
        )));
    }

    let store = state.store.as_ref();
    let projects = store
        .search_projects(
            params.query.as_deref().unwrap_or(""),
            params.sort.unwrap_or_default(),
        )
        .api_err("Failed to search projects")?;

    let mut out = Vec::with_capacity(projects.len());
    for project in projects {
        let owner = resolve_actor(store, &project.owner_id)?;
        let completion = store
            .project_completion(&project.id)
            .api_err("Failed to compute completion")?;
        out.push(CompletionView {
            item: project,
            owner,
            completion,
        });
    }

    Ok(Json(ApiResponse::success(out)))
}

async fn set_project_subscription(
    auth: RequireActivity,
    state: Arc<AppState>,
    key: String,
    desired: bool,
    star: bool,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let project = store
        .get_project_by_key(&key)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")?;

    if star {
        store
            .set_stargizer(TargetKind::Project, &project.id, &auth.activity.id, desired)
            .api_err("Failed to update stargizers")?;
    } else {
        store
            .set_watcher(TargetKind::Project, &project.id, &auth.activity.id, desired)
            .api_err("Failed to update watchers")?;
    }

    Ok(Json(ApiResponse::success(auth.activity.display())))
}

pub async fn watch_project(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    set_project_subscription(auth, state, key, req.desired, false).await
}

pub async fn star_project(
    auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(req): Json<SubscriptionRequest>,
) -> impl IntoResponse {
    set_project_subscription(auth, state, key, req.desired, true).await
}
