//! Actor Extractor
//!
//! Reads the identity headers forwarded by the gateway

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::AppError;
use crate::auth::Actor;
use crate::core::ServerState;
use crate::security_log;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_HOSTELS_HEADER: &str = "x-actor-hostels";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|h| h.to_str().ok())
}

/// Identity extractor
///
/// Missing id / role → 401 NotAuthenticated, unparsable → 401 InvalidIdentity
impl FromRequestParts<ServerState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        let (Some(id), Some(role)) = (
            header(parts, ACTOR_ID_HEADER),
            header(parts, ACTOR_ROLE_HEADER),
        ) else {
            security_log!("WARN", "identity_missing", uri = format!("{:?}", parts.uri));
            return Err(AppError::not_authenticated());
        };

        match Actor::from_headers(id, role, header(parts, ACTOR_HOSTELS_HEADER)) {
            Ok(actor) => {
                parts.extensions.insert(actor.clone());
                Ok(actor)
            }
            Err(e) => {
                security_log!(
                    "WARN",
                    "identity_invalid",
                    error = format!("{}", e),
                    uri = format!("{:?}", parts.uri)
                );
                Err(e)
            }
        }
    }
}
