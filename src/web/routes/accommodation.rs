use askama::Template;
use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Form,
};
use sqlx::SqlitePool;

use crate::forms::{AccommodationForm, FormErrors};
use crate::services::accommodation_service::{self, AccommodationView};
use crate::services::lbw_service::{self, LbwSummaryView};
use crate::web::middleware::auth::Viewer;
use crate::web::routes::{db_error_response, error_response, load_layout, render, Layout};

#[derive(Template)]
#[template(path = "accommodation.html")]
pub struct AccommodationTemplate {
    pub layout: Layout,
    pub lbw: LbwSummaryView,
    pub accommodations: Vec<AccommodationView>,
    pub form: AccommodationForm,
    pub errors: FormErrors,
    pub signed_in: bool,
    pub notice: Option<String>,
}

async fn render_page(
    pool: &SqlitePool,
    viewer: &Viewer,
    lbw_id: i64,
    form: AccommodationForm,
    errors: FormErrors,
    notice: Option<String>,
) -> Response {
    let lbw = match lbw_service::require_lbw(pool, lbw_id).await {
        Ok(l) => l,
        Err(e) => return error_response(e, "Accommodation"),
    };
    let accommodations = match accommodation_service::list(pool, lbw_id).await {
        Ok(a) => a,
        Err(e) => return error_response(e, "Accommodation list"),
    };
    let layout = match load_layout(pool, viewer).await {
        Ok(l) => l,
        Err(e) => return db_error_response(e, "Accommodation layout"),
    };
    render(&AccommodationTemplate {
        layout,
        lbw: lbw.into(),
        accommodations,
        form,
        errors,
        signed_in: viewer.id().is_some(),
        notice,
    })
}

pub async fn accommodation_handler(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
) -> Response {
    render_page(
        &pool,
        &viewer,
        lbw_id,
        AccommodationForm::default(),
        FormErrors::default(),
        None,
    )
    .await
}

/// Anonymous submissions are ignored; the page is shown again either way.
pub async fn offer_accommodation_handler(
    Extension(viewer): Extension<Viewer>,
    Path(lbw_id): Path<i64>,
    State(pool): State<SqlitePool>,
    Form(form): Form<AccommodationForm>,
) -> Response {
    let Some(user) = viewer.user() else {
        return render_page(
            &pool,
            &viewer,
            lbw_id,
            AccommodationForm::default(),
            FormErrors::default(),
            Some("Sign in to offer accommodation.".to_string()),
        )
        .await;
    };
    let valid = match form.validate() {
        Ok(v) => v,
        Err(errors) => return render_page(&pool, &viewer, lbw_id, form, errors, None).await,
    };
    match accommodation_service::offer(&pool, lbw_id, &user.id, &valid).await {
        Ok(_) => {
            render_page(
                &pool,
                &viewer,
                lbw_id,
                AccommodationForm::default(),
                FormErrors::default(),
                Some("Thanks, your accommodation was added.".to_string()),
            )
            .await
        }
        Err(e) => error_response(e, "Accommodation offer"),
    }
}
