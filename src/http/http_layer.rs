// HTTP layer - axum routes over the core services.
//
// Handlers stay thin: decode the request, call one core service, map its
// error onto a status code with a `{"detail": ...}` body.

#[path = "api_error.rs"]
pub mod api_error;

#[path = "routes.rs"]
pub mod routes;

pub use routes::{router, AppState};

/// Binds `host:port` and serves until the process is stopped.
pub async fn serve(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Endpoints: POST /chat, GET /auth, GET /auth/callback, GET /health");

    axum::serve(listener, app).await?;
    Ok(())
}
