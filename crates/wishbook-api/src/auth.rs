use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};

use wishbook_core::Engine;
use wishbook_gateway::dispatcher::Dispatcher;
use wishbook_types::api::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, VisitorRequest,
    VisitorResponse,
};
use wishbook_types::models::User;

use crate::error::ApiResult;
use crate::middleware::session_from_headers;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: Engine,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
}

/// Visitor bootstrap: no login step. A saved id resolves to its existing
/// identity; anything else mints a fresh guest.
pub async fn visitor(
    State(state): State<AppState>,
    Json(req): Json<VisitorRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.engine.get_or_create_visitor(req.saved_id).await?;
    let token = create_token(&state.jwt_secret, &user)?;

    Ok(Json(VisitorResponse {
        user_id: user.id,
        display_name: user.display_name,
        is_admin: user.is_admin,
        token,
    }))
}

/// Self-service registration, or admin account creation when the request
/// carries an admin bearer token and asks for `is_admin`.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let requester = session_from_headers(&headers, &state.jwt_secret);

    let user = state
        .engine
        .register(
            requester.as_ref(),
            &req.display_name,
            &req.password,
            req.is_admin,
        )
        .await?;
    let token = create_token(&state.jwt_secret, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .engine
        .verify_login(&req.display_name, &req.password)
        .await?;
    let token = create_token(&state.jwt_secret, &user)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        display_name: user.display_name,
        is_admin: user.is_admin,
        token,
    }))
}

fn create_token(secret: &str, user: &User) -> Result<String, wishbook_types::WishbookError> {
    let claims = Claims {
        sub: user.id,
        display_name: user.display_name.clone(),
        is_admin: user.is_admin,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| wishbook_types::WishbookError::Upstream(anyhow::anyhow!("token encode: {}", e)))
}
