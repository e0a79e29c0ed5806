//! Caller identity taken from gateway-set headers.
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user id in `x-buyer-id` and the user's role in `x-user-role`.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::BuyerId;

use crate::error::ApiError;

pub const BUYER_ID_HEADER: &str = "x-buyer-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Marketplace roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Supplier,
    Admin,
}

impl Role {
    /// Parses a role name, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buyer" => Some(Role::Buyer),
            "supplier" => Some(Role::Supplier),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// An authenticated caller acting as a buyer.
///
/// Rejects with 401 when the identity headers are missing or malformed and
/// with 403 when the caller is not a buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyerIdentity {
    pub buyer_id: BuyerId,
}

impl<S: Send + Sync> FromRequestParts<S> for BuyerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let buyer_id = header(&parts.headers, BUYER_ID_HEADER)?
            .parse::<BuyerId>()
            .map_err(|_| ApiError::Unauthorized(format!("Malformed {BUYER_ID_HEADER} header")))?;

        let role = header(&parts.headers, USER_ROLE_HEADER)?;
        match Role::parse(role) {
            Some(Role::Buyer) => Ok(Self { buyer_id }),
            _ => {
                tracing::info!(%buyer_id, role, "checkout refused for non-buyer role");
                Err(ApiError::Forbidden("Only buyers can check out".to_string()))
            }
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {name} header")))
}
