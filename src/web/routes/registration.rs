use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use sqlx::SqlitePool;

use crate::forms::{FormErrors, RegistrationForm};
use crate::services::lbw_service::{self, LbwSummaryView};
use crate::services::registration_service::{self, ParticipantView};
use crate::web::middleware::auth::{AuthenticatedUser, Viewer};
use crate::web::routes::{db_error_response, error_response, lbw_url, load_layout, render, Layout};

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub form: RegistrationForm,
    pub errors: FormErrors,
    pub existing: bool,
}

async fn render_register(
    pool: &SqlitePool,
    viewer: &Viewer,
    lbw_id: i64,
    form: RegistrationForm,
    errors: FormErrors,
    existing: bool,
) -> Response {
    let lbw = match lbw_service::require_lbw(pool, lbw_id).await {
        Ok(l) => l,
        Err(e) => return error_response(e, "Register page"),
    };
    let layout = match load_layout(pool, viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Register layout"),
    };
    render(&RegisterTemplate {
        layout,
        lbw: lbw.into(),
        form,
        errors,
        existing,
    })
}

pub async fn register_page(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    match registration_service::registration_form(&pool, lbw_id, &user.id).await {
        Ok((form, existing)) => {
            render_register(&pool, &viewer, lbw_id, form, FormErrors::default(), existing).await
        }
        Err(e) => error_response(e, "Register form"),
    }
}

pub async fn register_handler(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
    Form(form): Form<RegistrationForm>,
) -> Response {
    let valid = match form.validate() {
        Ok(v) => v,
        Err(errors) => {
            let existing = match registration_service::is_registered(&pool, lbw_id, &user.id).await {
                Ok(e) => e,
                Err(e) => return db_error_response(e, "Registration lookup"),
            };
            return render_register(&pool, &viewer, lbw_id, form, errors, existing).await;
        }
    };
    match registration_service::register(&pool, lbw_id, &user.id, &valid).await {
        Ok(()) => Redirect::to(&lbw_url(lbw_id)).into_response(),
        Err(e) => error_response(e, "Registration"),
    }
}

pub async fn deregister_handler(
    Extension(user): Extension<AuthenticatedUser>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    match registration_service::deregister(&pool, lbw_id, &user.id).await {
        Ok(()) => Redirect::to(&lbw_url(lbw_id)).into_response(),
        Err(e) => error_response(e, "Deregistration"),
    }
}

#[derive(Template)]
#[template(path = "participants.html")]
pub struct ParticipantsTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub participants: Vec<ParticipantView>,
}

pub async fn participants_handler(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    let lbw = match lbw_service::require_lbw(&pool, lbw_id).await {
        Ok(l) => l,
        Err(e) => return error_response(e, "Participants"),
    };
    let participants = match registration_service::participants(&pool, lbw_id).await {
        Ok(p) => p,
        Err(e) => return error_response(e, "Participants"),
    };
    let layout = match load_layout(&pool, &viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Participants layout"),
    };
    render(&ParticipantsTemplate {
        layout,
        lbw: lbw.into(),
        participants,
    })
}
