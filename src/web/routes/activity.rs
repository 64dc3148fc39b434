use askama::Template;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use sqlx::SqlitePool;
use tracing::warn;

use crate::forms::{ActivityForm, FormErrors, ScheduleForm};
use crate::services::activity_service::{self, ActivityCardView, ActivityView, ScheduleView};
use crate::services::lbw_service::{self, LbwSummaryView};
use crate::services::message_service::{self, MessageView};
use crate::services::ServiceError;
use crate::web::middleware::auth::{AuthenticatedUser, Viewer};
use crate::web::routes::{
    activities_url, activity_url, db_error_response, error_response, is_ajax, load_layout,
    render, request_host, Layout,
};
use crate::web::AppState;

#[derive(Template)]
#[template(path = "activities.html")]
pub struct ActivitiesTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub activities: Vec<ActivityCardView>,
}

pub async fn activities_handler(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    let lbw = match lbw_service::require_lbw(&pool, lbw_id).await {
        Ok(l) => l,
        Err(e) => return error_response(e, "Activities"),
    };
    let activities = match activity_service::list_cards(&pool, lbw_id).await {
        Ok(a) => a,
        Err(e) => return error_response(e, "Activities"),
    };
    let layout = match load_layout(&pool, &viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Activities layout"),
    };
    render(&ActivitiesTemplate {
        layout,
        lbw: lbw.into(),
        activities,
    })
}

#[derive(Template)]
#[template(path = "schedule.html")]
pub struct ScheduleTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub schedule: ScheduleView,
}

pub async fn schedule_handler(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    let lbw = match lbw_service::require_lbw(&pool, lbw_id).await {
        Ok(l) => l,
        Err(e) => return error_response(e, "Schedule"),
    };
    let schedule = match activity_service::load_schedule(&pool, lbw_id).await {
        Ok(s) => s,
        Err(e) => return error_response(e, "Schedule"),
    };
    let layout = match load_layout(&pool, &viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Schedule layout"),
    };
    render(&ScheduleTemplate {
        layout,
        lbw: lbw.into(),
        schedule,
    })
}

#[derive(Template)]
#[template(path = "propose_activity.html")]
pub struct ProposeActivityTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub form: ActivityForm,
    pub errors: FormErrors,
    pub is_update: bool,
}

async fn render_activity_form(
    pool: &SqlitePool,
    viewer: &Viewer,
    lbw_id: i64,
    form: ActivityForm,
    errors: FormErrors,
) -> Response {
    let lbw = match lbw_service::require_lbw(pool, lbw_id).await {
        Ok(l) => l,
        Err(e) => return error_response(e, "Activity form"),
    };
    let layout = match load_layout(pool, viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Activity form layout"),
    };
    let is_update = form
        .activity_id
        .as_deref()
        .is_some_and(|id| !id.trim().is_empty());
    render(&ProposeActivityTemplate {
        layout,
        lbw: lbw.into(),
        form,
        errors,
        is_update,
    })
}

pub async fn propose_activity_page(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    render_activity_form(
        &pool,
        &viewer,
        lbw_id,
        ActivityForm::default(),
        FormErrors::default(),
    )
    .await
}

pub async fn propose_activity_handler(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lbw_id): Path<i64>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ActivityForm>,
) -> Response {
    // Updates are checked before validation so outsiders never see the form.
    let update_id = form
        .activity_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok());
    if let Some(activity_id) = update_id {
        if let Err(e) = activity_service::require_activity(&state.pool, lbw_id, activity_id).await {
            return error_response(e, "Activity update");
        }
        match activity_service::is_owner(&state.pool, activity_id, &user.id).await {
            Ok(true) => {}
            Ok(false) => return Redirect::to(&activity_url(lbw_id, activity_id)).into_response(),
            Err(e) => return db_error_response(e, "Activity ownership"),
        }
    }

    let valid = match form.validate() {
        Ok(v) => v,
        Err(errors) => return render_activity_form(&state.pool, &viewer, lbw_id, form, errors).await,
    };
    let saved = match activity_service::save_activity(&state.pool, lbw_id, &user.id, &valid).await
    {
        Ok(s) => s,
        Err(ServiceError::Invalid(errors)) => {
            return render_activity_form(&state.pool, &viewer, lbw_id, form, errors).await
        }
        Err(e) => return error_response(e, "Activity proposal"),
    };

    if saved.created {
        match lbw_service::require_lbw(&state.pool, lbw_id).await {
            Ok(lbw) => {
                state
                    .mailer
                    .notify_new_activity(&lbw, &saved.activity, &request_host(&headers))
            }
            Err(e) => warn!("Skipping activity notification: {}", e),
        }
    }
    Redirect::to(&activities_url(lbw_id)).into_response()
}

pub async fn update_activity_page(
    Extension(viewer): Extension<Viewer>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((lbw_id, activity_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
) -> Response {
    let form = match activity_service::update_form(&pool, lbw_id, activity_id).await {
        Ok(f) => f,
        Err(e) => return error_response(e, "Activity update form"),
    };
    match activity_service::is_owner(&pool, activity_id, &user.id).await {
        Ok(true) => render_activity_form(&pool, &viewer, lbw_id, form, FormErrors::default()).await,
        Ok(false) => Redirect::to(&activity_url(lbw_id, activity_id)).into_response(),
        Err(e) => db_error_response(e, "Activity ownership"),
    }
}

#[derive(Template)]
#[template(path = "activity.html")]
pub struct ActivityTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub activity: ActivityView,
    pub signed_in: bool,
    pub activity_messages: Vec<MessageView>,
}

pub async fn activity_handler(
    Extension(viewer): Extension<Viewer>,
    Path((lbw_id, activity_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
) -> Response {
    let activity = match activity_service::load_view(&pool, lbw_id, activity_id, viewer.id()).await
    {
        Ok(a) => a,
        Err(e) => return error_response(e, "Activity"),
    };
    let lbw = match lbw_service::require_lbw(&pool, lbw_id).await {
        Ok(l) => l,
        Err(e) => return error_response(e, "Activity"),
    };
    let activity_messages = if viewer.id().is_some() {
        match message_service::activity_thread(&pool, activity_id, viewer.id()).await {
            Ok(m) => m,
            Err(e) => return db_error_response(e, "Activity messages"),
        }
    } else {
        vec![]
    };
    let layout = match load_layout(&pool, &viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Activity layout"),
    };
    render(&ActivityTemplate {
        layout,
        lbw: lbw.into(),
        activity,
        signed_in: viewer.id().is_some(),
        activity_messages,
    })
}

/// POST on the activity page sets (or clears) its start time.
pub async fn schedule_activity_handler(
    Extension(viewer): Extension<Viewer>,
    Path((lbw_id, activity_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
    Form(form): Form<ScheduleForm>,
) -> Response {
    let Some(user) = viewer.user() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let start = match form.start() {
        Ok(s) => s,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    match activity_service::schedule_activity(&pool, lbw_id, activity_id, &user.id, start).await {
        Ok(()) => Redirect::to(&activities_url(lbw_id)).into_response(),
        Err(e) => error_response(e, "Activity scheduling"),
    }
}

pub async fn activity_register_handler(
    Extension(user): Extension<AuthenticatedUser>,
    Path((lbw_id, activity_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
) -> Response {
    match activity_service::toggle_attendance(&pool, lbw_id, activity_id, &user.id).await {
        Ok(_) => Redirect::to(&activity_url(lbw_id, activity_id)).into_response(),
        Err(e) => error_response(e, "Activity attendance"),
    }
}

pub async fn cancel_activity_handler(
    Extension(viewer): Extension<Viewer>,
    Path((lbw_id, activity_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
    headers: HeaderMap,
) -> Response {
    if !is_ajax(&headers) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(user) = viewer.user() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match activity_service::cancel_activity(&pool, lbw_id, activity_id, &user.id).await {
        Ok(()) => "ok".into_response(),
        Err(e) => error_response(e, "Activity cancel"),
    }
}

pub async fn attachment_handler(
    Path((lbw_id, activity_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
) -> Response {
    match activity_service::load_attachment(&pool, lbw_id, activity_id).await {
        Ok((name, bytes)) => (
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(e, "Attachment download"),
    }
}

pub async fn upload_attachment_handler(
    Extension(viewer): Extension<Viewer>,
    Path((lbw_id, activity_id)): Path<(i64, i64)>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let Some(user) = viewer.user() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };
        if field.name() != Some("attachment") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("attachment").to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    }

    let Some((file_name, bytes)) = upload else {
        return (StatusCode::BAD_REQUEST, "attachment field missing").into_response();
    };
    match activity_service::store_attachment(
        &state.pool,
        &state.attachment_dir,
        lbw_id,
        activity_id,
        &user.id,
        &file_name,
        &bytes,
    )
    .await
    {
        Ok(()) => Redirect::to(&activity_url(lbw_id, activity_id)).into_response(),
        Err(e) => error_response(e, "Attachment upload"),
    }
}
