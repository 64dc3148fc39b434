use askama::Template;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use sqlx::SqlitePool;

use crate::forms::{FormErrors, MessageForm, MessageTarget};
use crate::services::lbw_service::LbwSummaryView;
use crate::services::message_service::{self, ComposeContext, MessageView};
use crate::services::{ServiceError, ServiceResult};
use crate::web::middleware::auth::Viewer;
use crate::web::routes::{
    activity_url, db_error_response, error_response, is_ajax, lbw_url, load_layout,
    redirect_home, render, Layout,
};

#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate {
    pub layout: Layout,
    pub lbw_id: i64,
    pub message: MessageView,
    pub replies: Vec<MessageView>,
    pub activity_id: Option<i64>,
    pub activity_name: Option<String>,
}

pub async fn message_handler(
    Extension(viewer): Extension<Viewer>,
    Path((lbw_id, message_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
) -> Response {
    if viewer.id().is_none() {
        return redirect_home();
    }
    let page = match message_service::load_message_page(&pool, lbw_id, message_id, viewer.id())
        .await
    {
        Ok(p) => p,
        Err(e) => return error_response(e, "Message"),
    };
    let layout = match load_layout(&pool, &viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Message layout"),
    };
    let (activity_id, activity_name) = match page.activity {
        Some(a) => (Some(a.activity_id), Some(a.short_name)),
        None => (None, None),
    };
    render(&MessageTemplate {
        layout,
        lbw_id,
        message: page.message,
        replies: page.replies,
        activity_id,
        activity_name,
    })
}

#[derive(Template)]
#[template(path = "message_write.html")]
pub struct ComposeTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub activity_id: Option<i64>,
    pub activity_name: Option<String>,
    pub parent: Option<MessageView>,
    pub form: MessageForm,
    pub errors: FormErrors,
}

async fn render_compose(
    pool: &SqlitePool,
    viewer: &Viewer,
    ctx: ServiceResult<ComposeContext>,
    form: MessageForm,
    errors: FormErrors,
) -> Response {
    let ctx = match ctx {
        Ok(c) => c,
        Err(e) => return error_response(e, "Message compose"),
    };
    let layout = match load_layout(pool, viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Message compose layout"),
    };
    let (activity_id, activity_name) = match ctx.activity {
        Some(a) => (Some(a.activity_id), Some(a.short_name)),
        None => (None, None),
    };
    let mut form = form;
    if form.subject.is_empty() {
        if let Some(parent) = &ctx.parent {
            form.subject = reply_subject(&parent.subject);
        }
    }
    render(&ComposeTemplate {
        layout,
        lbw: ctx.lbw.into(),
        activity_id,
        activity_name,
        parent: ctx.parent,
        form,
        errors,
    })
}

fn reply_subject(subject: &str) -> String {
    if subject.is_empty() || subject.to_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}

pub async fn write_lbw_message_handler(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    if viewer.id().is_none() {
        return redirect_home();
    }
    let ctx = message_service::compose_for_lbw(&pool, lbw_id).await;
    render_compose(&pool, &viewer, ctx, MessageForm::default(), FormErrors::default()).await
}

pub async fn write_activity_message_handler(
    Extension(viewer): Extension<Viewer>,
    Path((lbw_id, activity_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
) -> Response {
    if viewer.id().is_none() {
        return redirect_home();
    }
    let ctx = message_service::compose_for_activity(&pool, lbw_id, activity_id).await;
    render_compose(&pool, &viewer, ctx, MessageForm::default(), FormErrors::default()).await
}

pub async fn reply_message_handler(
    Extension(viewer): Extension<Viewer>,
    Path((lbw_id, message_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
) -> Response {
    if viewer.id().is_none() {
        return redirect_home();
    }
    let ctx = message_service::compose_reply(&pool, lbw_id, message_id, viewer.id()).await;
    render_compose(&pool, &viewer, ctx, MessageForm::default(), FormErrors::default()).await
}

// Rebuilds the compose page around a rejected submission.
async fn compose_again(
    pool: &SqlitePool,
    viewer: &Viewer,
    lbw_id: i64,
    form: MessageForm,
    errors: FormErrors,
) -> Response {
    let activity_id = form
        .activity_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok());
    let mut ctx = match activity_id {
        Some(activity_id) => message_service::compose_for_activity(pool, lbw_id, activity_id).await,
        None => message_service::compose_for_lbw(pool, lbw_id).await,
    };
    let parent_id = form
        .parent_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok());
    if let (Ok(c), Some(parent_id)) = (&mut ctx, parent_id) {
        if let Ok(parent) =
            message_service::compose_reply(pool, lbw_id, parent_id, viewer.id()).await
        {
            c.parent = parent.parent;
        }
    }
    render_compose(pool, viewer, ctx, form, errors).await
}

pub async fn save_message_handler(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
    Form(form): Form<MessageForm>,
) -> Response {
    let Some(user) = viewer.user() else {
        return redirect_home();
    };
    let valid = match form.validate() {
        Ok(v) => v,
        Err(errors) => return compose_again(&pool, &viewer, lbw_id, form, errors).await,
    };
    match message_service::save_message(&pool, lbw_id, &user.id, &valid).await {
        Ok(MessageTarget::Activity(activity_id)) => {
            Redirect::to(&activity_url(lbw_id, activity_id)).into_response()
        }
        Ok(MessageTarget::Lbw(lbw_id)) => Redirect::to(&lbw_url(lbw_id)).into_response(),
        Err(ServiceError::Invalid(errors)) => {
            compose_again(&pool, &viewer, lbw_id, form, errors).await
        }
        Err(e) => error_response(e, "Message save"),
    }
}

pub async fn delete_message_handler(
    Extension(viewer): Extension<Viewer>,
    Path((lbw_id, message_id)): Path<(i64, i64)>,
    State(pool): State<SqlitePool>,
    headers: HeaderMap,
) -> Response {
    if !is_ajax(&headers) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(user) = viewer.user() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match message_service::delete_message(&pool, lbw_id, message_id, &user.id).await {
        Ok(()) => "ok".into_response(),
        Err(e) => error_response(e, "Message delete"),
    }
}
