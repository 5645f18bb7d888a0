//! Extract the requester identity from the `X-Requester` header.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const REQUESTER_HEADER: &str = "X-Requester";

/// Used when the header is absent or blank.
pub const ANONYMOUS_REQUESTER: &str = "anonymous";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requester(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(REQUESTER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(ANONYMOUS_REQUESTER);
        Ok(Requester(value.to_string()))
    }
}
