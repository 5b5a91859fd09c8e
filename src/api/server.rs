use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{routes, state::ApiState};

/// Start the API server and run until `shutdown` resolves
pub async fn start_api_server(
    state: ApiState,
    host: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_app(state);

    let addr = format!("{}:{}", host, port);
    let socket_addr: SocketAddr = addr.parse()?;

    info!(address = %addr, "Starting API server");

    let listener = TcpListener::bind(socket_addr).await?;

    info!(address = %addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| {
            error!(error = %e, "API server error");
            e.into()
        })
}

/// Create the Axum application with middleware
pub fn create_app(state: ApiState) -> Router {
    routes::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
