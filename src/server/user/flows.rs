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
use crate::server::dto::{CreateFlowRequest, FlowResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_title;
use crate::types::{Flow, State as FlowState};

pub async fn create_flow(
    _auth: RequireActivity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFlowRequest>,
) -> impl IntoResponse {
    validate_title(&req.title, "Flow")?;

    if req.states.is_empty() {
        return Err(ApiError::bad_request("Flow needs at least one state"));
    }
    if !req.states.iter().any(|s| s.terminal) {
        return Err(ApiError::bad_request("Flow needs at least one terminal state"));
    }
    for s in &req.states {
        validate_title(&s.title, "State")?;
    }

    let flow = Flow {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        created_at: Utc::now(),
    };
    // The first state is the entry state new goals start in
    let states: Vec<FlowState> = req
        .states
        .into_iter()
        .enumerate()
        .map(|(position, s)| FlowState {
            id: Uuid::new_v4().to_string(),
            flow_id: flow.id.clone(),
            title: s.title,
            position: position as i32,
            terminal: s.terminal,
        })
        .collect();

    state
        .store
        .create_flow(&flow, &states)
        .api_err("Failed to create flow")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(FlowResponse { flow, states })),
    ))
}

pub async fn list_flows(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::success(Vec::<FlowResponse>::new())));
    }

    let store = state.store.as_ref();
    let flows = store.list_flows().api_err("Failed to list flows")?;

    let mut out = Vec::with_capacity(flows.len());
    for flow in flows {
        let states = store
            .list_flow_states(&flow.id)
            .api_err("Failed to list flow states")?;
        out.push(FlowResponse { flow, states });
    }

    Ok(Json(ApiResponse::success(out)))
}

pub async fn get_flow(
    auth: OptionalActivity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if auth.0.is_none() {
        return Ok::<_, ApiError>(Json(ApiResponse::<FlowResponse>::null()));
    }

    let store = state.store.as_ref();
    let flow = store
        .get_flow(&id)
        .api_err("Failed to get flow")?
        .or_not_found("Flow not found")?;
    let states = store
        .list_flow_states(&flow.id)
        .api_err("Failed to list flow states")?;

    Ok(Json(ApiResponse::success(FlowResponse { flow, states })))
}
