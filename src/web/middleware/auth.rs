use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::database::user_repo;

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: String,
    pub name: Option<String>,
}

/// Who is looking at the page. Always present in request extensions once
/// `resolve_user` ran; anonymous visitors get `Viewer(None)`.
#[derive(Clone, Debug, Default)]
pub struct Viewer(pub Option<AuthenticatedUser>);

impl Viewer {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.id.as_str())
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.0.as_ref()
    }
}

#[derive(Deserialize)]
struct JwtPayload {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

/// Value of the `access_token` cookie, if any.
pub fn access_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix("access_token="))
        })
        .filter(|t| !t.is_empty())
}

// Only the payload is read; the token is issued and checked by the auth service.
fn decode_payload(token: &str) -> Option<JwtPayload> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
    serde_json::from_slice::<JwtPayload>(&payload_bytes).ok()
}

async fn identify(pool: &SqlitePool, headers: &HeaderMap) -> sqlx::Result<Option<AuthenticatedUser>> {
    if let Some(payload) = access_token(headers).and_then(decode_payload) {
        user_repo::upsert_user(
            pool,
            &payload.sub,
            payload.name.as_deref(),
            payload.email.as_deref(),
        )
        .await?;
        return Ok(Some(AuthenticatedUser {
            id: payload.sub,
            name: payload.name,
        }));
    }

    // No token: fall back to the local current_user row, if any.
    let current = user_repo::load_current_user(pool).await?;
    Ok(current.map(|u| AuthenticatedUser {
        name: Some(u.display_name().to_string()),
        id: u.user_id,
    }))
}

pub async fn resolve_user(
    State(pool): State<SqlitePool>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match identify(&pool, request.headers()).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Could not resolve viewer: {}", e);
            None
        }
    };

    if let Some(user) = user.clone() {
        request.extensions_mut().insert(user);
    }
    request.extensions_mut().insert(Viewer(user));
    next.run(request).await
}

pub async fn require_auth(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_some() {
        return next.run(request).await;
    }
    (StatusCode::UNAUTHORIZED, "Unauthorized - Please login").into_response()
}
