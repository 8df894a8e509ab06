//! Booking rate guard middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::Actor;
use crate::core::ServerState;
use crate::utils::AppResult;

/// Sliding-window limit per caller on book / cancel / edit routes
///
/// Keyed by `role:id`, checked before the body is parsed.
pub async fn rate_guard(
    State(state): State<ServerState>,
    actor: Actor,
    req: Request,
    next: Next,
) -> AppResult<Response> {
    state
        .rate_guard
        .check_and_record(&format!("{}:{}", actor.role, actor.id))?;
    Ok(next.run(req).await)
}
