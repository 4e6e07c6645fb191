pub mod access;
mod flows;
mod goals;
mod identity;
mod projects;
mod tags;
mod teams;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Identity
        .route("/activities", get(identity::find_activities))
        .route("/activities/invite", post(identity::invite_ghost))
        // Flows
        .route("/flows", get(flows::list_flows))
        .route("/flows", post(flows::create_flow))
        .route("/flows/{id}", get(flows::get_flow))
        // Tags
        .route("/tags", get(tags::list_tags))
        .route("/tags", post(tags::create_tag))
        // Projects
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        .route("/projects/completion", get(projects::projects_completion))
        .route("/projects/{key}", get(projects::get_project))
        .route("/projects/{key}", patch(projects::update_project))
        .route("/projects/{key}", delete(projects::delete_project))
        .route("/projects/{key}/goals", post(projects::project_goals))
        .route("/projects/{key}/watch", post(projects::watch_project))
        .route("/projects/{key}/star", post(projects::star_project))
        // Teams
        .route("/teams", get(teams::list_teams))
        .route("/teams", post(teams::create_team))
        .route("/teams/completion", get(teams::teams_completion))
        .route("/teams/{id}", get(teams::get_team))
        .route("/teams/{id}", patch(teams::update_team))
        .route("/teams/{id}", delete(teams::delete_team))
        .route("/teams/{id}/parent", put(teams::set_team_parent))
        .route("/teams/{id}/projects", post(teams::add_team_project))
        .route(
            "/teams/{id}/projects/{project_id}",
            delete(teams::remove_team_project),
        )
        .route("/teams/{id}/goals", post(teams::team_goals))
        .route("/teams/{id}/watch", post(teams::watch_team))
        .route("/teams/{id}/star", post(teams::star_team))
        // Goals
        .route("/goals", post(goals::create_goal))
        .route("/goals/{id}", get(goals::get_goal))
        .route("/goals/{id}", patch(goals::update_goal))
        .route("/goals/{id}", delete(goals::delete_goal))
        .route("/goals/{id}/state", put(goals::set_goal_state))
        .route("/goals/{id}/archive", put(goals::set_goal_archived))
        .route("/goals/{id}/relations", post(goals::link_goals))
        .route(
            "/goals/{id}/relations/{kind}/{target_id}",
            delete(goals::unlink_goals),
        )
        .route("/goals/{id}/tags", put(goals::set_goal_tags))
        .route("/goals/{id}/participants", put(goals::set_goal_participants))
        .route("/goals/{id}/watch", post(goals::watch_goal))
        .route("/goals/{id}/star", post(goals::star_goal))
}
