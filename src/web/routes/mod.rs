use askama::Template;
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tracing::warn;

use crate::services::lbw_service::{self, LbwSummaryView};
use crate::services::ServiceError;
use crate::web::middleware::auth::Viewer;

pub mod accommodation;
pub mod activity;
pub mod lbw;
pub mod message;
pub mod registration;

pub const BUILD_ID: &str = env!("LBW_BUILD_ID");

/// Data every page template shares: the sidebar and who is signed in.
pub struct Layout {
    pub lbws: Vec<LbwSummaryView>,
    pub viewer_name: Option<String>,
    pub build_id: &'static str,
}

pub async fn load_layout(pool: &SqlitePool, viewer: &Viewer) -> sqlx::Result<Layout> {
    Ok(Layout {
        lbws: lbw_service::list_all(pool).await?,
        viewer_name: viewer
            .user()
            .map(|u| u.name.clone().unwrap_or_else(|| u.id.clone())),
        build_id: BUILD_ID,
    })
}

pub fn render(template: &impl Template) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!("Template render failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Maps a service failure onto a status code, logging the unexpected ones.
pub fn error_response(err: ServiceError, context: &str) -> Response {
    match err {
        ServiceError::NotFound => StatusCode::NOT_FOUND.into_response(),
        ServiceError::Forbidden => StatusCode::FORBIDDEN.into_response(),
        ServiceError::Invalid(errors) => (StatusCode::BAD_REQUEST, errors.to_string()).into_response(),
        ServiceError::Database(_) | ServiceError::Storage(_) => {
            warn!("{} failed: {}", context, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn db_error_response(err: sqlx::Error, context: &str) -> Response {
    error_response(ServiceError::Database(err), context)
}

/// Destructive single-click actions are only served to the page's own
/// XMLHttpRequest calls.
pub fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Host the request was addressed to, for links in outgoing mail.
pub fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string()
}

pub fn redirect_home() -> Response {
    Redirect::to("/").into_response()
}

pub fn lbw_url(lbw_id: i64) -> String {
    format!("/lbw/{}", lbw_id)
}

pub fn activities_url(lbw_id: i64) -> String {
    format!("/lbw/{}/activities", lbw_id)
}

pub fn activity_url(lbw_id: i64, activity_id: i64) -> String {
    format!("/lbw/{}/activities/{}", lbw_id, activity_id)
}
