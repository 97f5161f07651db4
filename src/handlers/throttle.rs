use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::ApiError;
use crate::metrics::{REQUEST_TOTAL, THROTTLED_TOTAL};
use crate::state::AppState;

// Admission check in front of every /api/v1 route
pub async fn throttle(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();

    let client = client_id(&request);
    if !state.throttle.admit(&client) {
        THROTTLED_TOTAL.inc();
        tracing::debug!(%client, "request throttled");
        return ApiError::Throttled.into_response();
    }

    next.run(request).await
}

// Peer IP, without the port: one client, many connections
fn client_id(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn client_id_ignores_port() {
        let addr: SocketAddr = "192.168.1.7:54321".parse().unwrap();
        let mut request = Request::new(Body::empty());
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_id(&request), "192.168.1.7");
    }

    #[test]
    fn client_id_without_peer_is_unknown() {
        let request = Request::new(Body::empty());
        assert_eq!(client_id(&request), "unknown");
    }
}
