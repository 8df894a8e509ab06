//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`bookings`] - 订餐写入 + 订餐记录
//! - [`reports`] - 日历 / 看板 / 外出单
//! - [`meal_config`] - 用餐时间、截止时间、菜单
//!
//! 所有业务路由都需要网关转发的 `x-actor-*` 身份头，见 [`crate::auth::extractor`]。

pub mod bookings;
pub mod guard;
pub mod health;
pub mod meal_config;
pub mod reports;

use std::time::Duration;

use axum::Router;
use http::{HeaderName, HeaderValue, StatusCode};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Random 64-bit hex request id
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = format!("{:016x}", rand::random::<u64>());
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware)
pub fn build_router(state: &ServerState) -> Router<ServerState> {
    let hostel_routes = bookings::hostel_routes(state)
        .merge(reports::hostel_routes())
        .merge(meal_config::hostel_routes());

    Router::new()
        // Hostel scoped API - actor identity required
        .nest("/api/hostels/{hostel_id}", hostel_routes)
        // Booking by id - actor identity required
        .nest("/api/bookings", bookings::booking_routes(state))
        // Health API - public route
        .merge(health::router())
}

/// 408 once a request runs longer than `timeout`
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Build a fully configured application with all middleware and state
///
/// This is used by both the HTTP server and the router tests
pub fn build_app(state: ServerState) -> Router {
    health::mark_started();
    build_router(&state)
        // ========== Tower HTTP Middleware ==========
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Timeout - 408 when a handler exceeds REQUEST_TIMEOUT_MS
        .layer(timeout_layer(state.config.request_timeout()))
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        // Request ID - Generate unique ID for each request
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_slow_request_times_out_with_408() {
        let app: Router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "done"
                }),
            )
            .route("/fast", get(|| async { "done" }))
            .layer(timeout_layer(Duration::from_millis(20)));

        let request = |uri: &str| http::Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(request("/slow")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);

        let resp = app.oneshot(request("/fast")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
