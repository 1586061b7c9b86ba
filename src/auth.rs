use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AuthError;

/// The only thing this core needs from the external identity system: a
/// stable player id. Issuance, refresh, and profile data are out of scope.
#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: Uuid,
    exp: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerIdentity {
    pub player_id: Uuid,
}

pub fn authenticate(bearer_token: Option<&str>, jwt_secret: &str) -> Result<PlayerIdentity, AuthError> {
    let token = bearer_token.ok_or(AuthError::MissingToken)?;
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(PlayerIdentity {
        player_id: data.claims.sub,
    })
}

/// Pulls a bearer token from the `Authorization` header, falling back to a
/// `?token=` query parameter (useful for browser `WebSocket` clients, which
/// cannot set custom headers on the handshake request).
pub fn extract_token(req: &actix_web::HttpRequest) -> Option<String> {
    if let Some(h) = req.headers().get("Authorization") {
        if let Ok(s) = h.to_str() {
            return Some(s.to_string());
        }
    }
    req.query_string()
        .split('&')
        .find_map(|pair| pair.strip_prefix("token=").map(|v| v.to_string()))
}
