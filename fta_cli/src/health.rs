// Liveness endpoint for process supervisors

use axum::{routing::get, Json, Router};
use log::info;
use serde_json::{json, Value};

pub fn router() -> Router {
    Router::new().route("/", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn serve(port: u16) -> std::io::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Health server listening on {}", bind_addr);
    axum::serve(listener, router()).await
}
