use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use wishbook_types::api::Claims;
use wishbook_types::models::Session;

/// Extract and validate the JWT from the Authorization header, exposing the
/// resolved `Session` to handlers as a request extension.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let secret =
        std::env::var("WISHBOOK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());

    let session =
        session_from_headers(req.headers(), &secret).ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// Best-effort session resolution for routes where a token is optional.
pub fn session_from_headers(headers: &HeaderMap, secret: &str) -> Option<Session> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some(Session {
        user_id: token_data.claims.sub,
        display_name: token_data.claims.display_name,
        is_admin: token_data.claims.is_admin,
    })
}
