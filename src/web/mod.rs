use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, get_service, post},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use sqlx::SqlitePool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::services::notification_service::Mailer;

pub mod middleware;
pub mod routes;

use self::middleware::auth as auth_middleware;
use self::routes::{accommodation, activity, lbw, message, registration};

pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub mailer: Mailer,
    pub attachment_dir: Arc<PathBuf>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

pub fn router(state: AppState) -> Router {
    // Routes that only make sense for a signed-in user.
    let protected_routes = Router::new()
        .route(
            "/lbw/propose",
            get(lbw::propose_lbw_page).post(lbw::propose_lbw_handler),
        )
        .route(
            "/lbw/:lbw_id/update",
            get(lbw::update_lbw_page).post(lbw::update_lbw_handler),
        )
        .route(
            "/lbw/:lbw_id/delete",
            get(lbw::delete_lbw_page).post(lbw::delete_lbw_handler),
        )
        .route(
            "/lbw/:lbw_id/register",
            get(registration::register_page).post(registration::register_handler),
        )
        .route(
            "/lbw/:lbw_id/deregister",
            post(registration::deregister_handler),
        )
        .route(
            "/lbw/:lbw_id/activities/propose",
            get(activity::propose_activity_page).post(activity::propose_activity_handler),
        )
        .route(
            "/lbw/:lbw_id/activities/:activity_id/update",
            get(activity::update_activity_page),
        )
        .route(
            "/lbw/:lbw_id/activities/:activity_id/register",
            post(activity::activity_register_handler),
        )
        .route_layer(from_fn(auth_middleware::require_auth));

    let public_routes = Router::new()
        .route("/", get(lbw::index_handler))
        .route("/lbw/:lbw_id", get(lbw::detail_handler))
        .route("/lbw/:lbw_id/participants", get(registration::participants_handler))
        .route("/lbw/:lbw_id/schedule", get(activity::schedule_handler))
        .route("/lbw/:lbw_id/tshirts", get(lbw::tshirts_handler))
        .route("/lbw/:lbw_id/rides", get(lbw::rides_handler))
        .route("/lbw/:lbw_id/activities", get(activity::activities_handler))
        .route(
            "/lbw/:lbw_id/activities/:activity_id",
            get(activity::activity_handler).post(activity::schedule_activity_handler),
        )
        .route(
            "/lbw/:lbw_id/activities/:activity_id/attachment",
            get(activity::attachment_handler).post(activity::upload_attachment_handler),
        )
        .route(
            "/lbw/:lbw_id/activities/:activity_id/messages/write",
            get(message::write_activity_message_handler),
        )
        .route("/lbw/:lbw_id/messages", post(message::save_message_handler))
        // AJAX-only endpoints check the request kind before the viewer.
        .route(
            "/lbw/:lbw_id/activities/:activity_id/cancel",
            post(activity::cancel_activity_handler),
        )
        .route(
            "/lbw/:lbw_id/messages/:message_id/delete",
            post(message::delete_message_handler),
        )
        .route(
            "/lbw/:lbw_id/messages/write",
            get(message::write_lbw_message_handler),
        )
        .route("/lbw/:lbw_id/messages/:message_id", get(message::message_handler))
        .route(
            "/lbw/:lbw_id/messages/:message_id/reply",
            get(message::reply_message_handler),
        )
        .route(
            "/lbw/:lbw_id/accommodation",
            get(accommodation::accommodation_handler).post(accommodation::offer_accommodation_handler),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(
            "/assets",
            get_service(ServeDir::new("assets")).layer(SetResponseHeaderLayer::if_not_present(
                CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            )),
        )
        .layer(from_fn_with_state(
            state.clone(),
            auth_middleware::resolve_user,
        ))
        .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
