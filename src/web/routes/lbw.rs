use askama::Template;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use sqlx::SqlitePool;

use crate::forms::{DeleteLbwForm, FormErrors, LbwForm};
use crate::services::lbw_service::{self, LbwDetailView, LbwSummaryView};
use crate::services::message_service::{self, MessageView};
use crate::services::ServiceError;
use crate::web::middleware::auth::{AuthenticatedUser, Viewer};
use crate::web::routes::{
    db_error_response, error_response, lbw_url, load_layout, redirect_home, render, request_host,
    Layout,
};
use crate::web::AppState;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub layout: Layout,
    pub index_lbws: Vec<LbwSummaryView>,
    pub signed_in: bool,
}

pub async fn index_handler(
    Extension(viewer): Extension<Viewer>,
    State(pool): State<SqlitePool>,
) -> Response {
    let layout = match load_layout(&pool, &viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Index layout"),
    };
    let index_lbws = match lbw_service::list_index(&pool, viewer.id()).await {
        Ok(v) => v,
        Err(e) => return db_error_response(e, "Index listing"),
    };
    render(&IndexTemplate {
        layout,
        index_lbws,
        signed_in: viewer.id().is_some(),
    })
}

#[derive(Template)]
#[template(path = "detail.html")]
pub struct DetailTemplate {
    pub layout: Layout,
    pub lbw: LbwDetailView,
    pub signed_in: bool,
    pub lbw_messages: Vec<MessageView>,
}

pub async fn detail_handler(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    let lbw = match lbw_service::load_detail_view(&pool, lbw_id, viewer.id()).await {
        Ok(v) => v,
        Err(e) => return error_response(e, "LBW detail"),
    };
    // Threads are only shown to signed-in visitors.
    let lbw_messages = if viewer.id().is_some() {
        match message_service::lbw_thread(&pool, lbw_id, viewer.id()).await {
            Ok(m) => m,
            Err(e) => return db_error_response(e, "LBW messages"),
        }
    } else {
        vec![]
    };
    let layout = match load_layout(&pool, &viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "LBW detail layout"),
    };
    render(&DetailTemplate {
        layout,
        lbw,
        signed_in: viewer.id().is_some(),
        lbw_messages,
    })
}

#[derive(Template)]
#[template(path = "propose_lbw.html")]
pub struct ProposeLbwTemplate {
    pub layout: Layout,
    pub form: LbwForm,
    pub errors: FormErrors,
    pub action: String,
    pub heading: String,
}

async fn render_lbw_form(
    pool: &SqlitePool,
    viewer: &Viewer,
    form: LbwForm,
    errors: FormErrors,
    lbw_id: Option<i64>,
) -> Response {
    let layout = match load_layout(pool, viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "LBW form layout"),
    };
    let (action, heading) = match lbw_id {
        Some(id) => (format!("/lbw/{}/update", id), "Update LBW".to_string()),
        None => ("/lbw/propose".to_string(), "Propose an LBW".to_string()),
    };
    render(&ProposeLbwTemplate {
        layout,
        form,
        errors,
        action,
        heading,
    })
}

pub async fn propose_lbw_page(
    Extension(viewer): Extension<Viewer>,
    State(pool): State<SqlitePool>,
) -> Response {
    render_lbw_form(&pool, &viewer, LbwForm::default(), FormErrors::default(), None).await
}

pub async fn propose_lbw_handler(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LbwForm>,
) -> Response {
    let valid = match form.validate() {
        Ok(v) => v,
        Err(errors) => return render_lbw_form(&state.pool, &viewer, form, errors, None).await,
    };
    match lbw_service::create_lbw(&state.pool, &user.id, &valid).await {
        Ok(lbw) => {
            state.mailer.notify_new_lbw(&lbw, &request_host(&headers));
            Redirect::to(&lbw_url(lbw.lbw_id)).into_response()
        }
        Err(ServiceError::Invalid(errors)) => {
            render_lbw_form(&state.pool, &viewer, form, errors, None).await
        }
        Err(e) => error_response(e, "LBW proposal"),
    }
}

pub async fn update_lbw_page(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    match lbw_service::is_owner(&pool, lbw_id, &user.id).await {
        Ok(true) => {}
        Ok(false) => return Redirect::to(&lbw_url(lbw_id)).into_response(),
        Err(e) => return db_error_response(e, "LBW ownership"),
    }
    match lbw_service::update_form(&pool, lbw_id).await {
        Ok(form) => render_lbw_form(&pool, &viewer, form, FormErrors::default(), Some(lbw_id)).await,
        Err(e) => error_response(e, "LBW update form"),
    }
}

pub async fn update_lbw_handler(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
    Form(form): Form<LbwForm>,
) -> Response {
    if let Err(e) = lbw_service::require_lbw(&pool, lbw_id).await {
        return error_response(e, "LBW update");
    }
    match lbw_service::is_owner(&pool, lbw_id, &user.id).await {
        Ok(true) => {}
        Ok(false) => return Redirect::to(&lbw_url(lbw_id)).into_response(),
        Err(e) => return db_error_response(e, "LBW ownership"),
    }
    let valid = match form.validate() {
        Ok(v) => v,
        Err(errors) => return render_lbw_form(&pool, &viewer, form, errors, Some(lbw_id)).await,
    };
    match lbw_service::update_lbw(&pool, lbw_id, &user.id, &valid).await {
        Ok(()) | Err(ServiceError::Forbidden) => Redirect::to(&lbw_url(lbw_id)).into_response(),
        Err(ServiceError::Invalid(errors)) => {
            render_lbw_form(&pool, &viewer, form, errors, Some(lbw_id)).await
        }
        Err(e) => error_response(e, "LBW update"),
    }
}

#[derive(Template)]
#[template(path = "delete_lbw.html")]
pub struct DeleteLbwTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub mismatch: bool,
}

async fn render_delete_page(
    pool: &SqlitePool,
    viewer: &Viewer,
    user: &AuthenticatedUser,
    lbw_id: i64,
    mismatch: bool,
) -> Response {
    let lbw = match lbw_service::require_lbw(pool, lbw_id).await {
        Ok(l) => l,
        Err(e) => return error_response(e, "LBW delete page"),
    };
    match lbw_service::is_owner(pool, lbw_id, &user.id).await {
        Ok(true) => {}
        Ok(false) => return redirect_home(),
        Err(e) => return db_error_response(e, "LBW ownership"),
    }
    let layout = match load_layout(pool, viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "LBW delete layout"),
    };
    render(&DeleteLbwTemplate {
        layout,
        lbw: lbw.into(),
        mismatch,
    })
}

pub async fn delete_lbw_page(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    render_delete_page(&pool, &viewer, &user, lbw_id, false).await
}

pub async fn delete_lbw_handler(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
    Form(form): Form<DeleteLbwForm>,
) -> Response {
    if !form.confirms(lbw_id) {
        return render_delete_page(&pool, &viewer, &user, lbw_id, true).await;
    }
    match lbw_service::delete_lbw(&pool, lbw_id, &user.id).await {
        Ok(()) | Err(ServiceError::Forbidden) => redirect_home(),
        Err(e) => error_response(e, "LBW delete"),
    }
}

pub async fn tshirts_handler(Path(lbw_id): Path<i64>) -> impl IntoResponse {
    (StatusCode::OK, format!("Showing tshirts for lbw {}.", lbw_id))
}

pub async fn rides_handler(Path(lbw_id): Path<i64>) -> impl IntoResponse {
    (StatusCode::OK, format!("Showing rides for lbw {}.", lbw_id))
}
