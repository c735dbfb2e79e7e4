//! Request extractors for identity and visitor metadata

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, Extensions, HeaderMap},
};
use tracing::warn;

use super::error::ApiError;
use super::AppState;
use crate::client_ip::extract_client_ip;
use crate::models::User;
use crate::views::VisitorMetadata;

/// The authenticated caller. Rejects the request when no valid bearer
/// token is present.
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(&parts.headers).ok_or(ApiError::Unauthorized("Not authorized"))?;

        let claims = state.tokens.validate(token).map_err(|e| {
            warn!("Rejected bearer token: {e:#}");
            ApiError::Unauthorized("Invalid token")
        })?;

        let user = state
            .storage
            .get_user(claims.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

        Ok(AuthUser(user))
    }
}

/// Id of the caller when a valid bearer token is present. Never rejects;
/// a bad token is treated as an anonymous request.
pub struct MaybeAuthUser(pub Option<i64>);

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let id = bearer_token(&parts.headers)
            .and_then(|token| state.tokens.validate(token).ok())
            .map(|claims| claims.id);
        Ok(MaybeAuthUser(id))
    }
}

/// Network address and user-agent of the caller
pub struct Visitor(pub VisitorMetadata);

impl FromRequestParts<Arc<AppState>> for Visitor {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ip = client_ip(&parts.headers, &parts.extensions, state);
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        Ok(Visitor(VisitorMetadata::new(ip, user_agent)))
    }
}

pub(crate) fn client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    state: &AppState,
) -> Option<IpAddr> {
    let socket_ip = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    extract_client_ip(headers, socket_ip, &state.config.client_ip)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(auth: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(auth));
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers_with("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
