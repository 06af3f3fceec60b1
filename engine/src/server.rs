use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::{
    api::{ErrorBody, GENERATE_QR_PATH, GenerateQrRequest},
    error::GenerationError,
    generation::GenerationRequest,
    job_proxy::JobProxy,
};

pub fn router(proxy: JobProxy) -> Router {
    Router::new()
        .route("/", get(|| async { "QR proxy is running" }))
        .route(GENERATE_QR_PATH, post(generate_qr))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(proxy))
}

/// Binds the listen address. `host` may be a name such as `localhost`.
pub async fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

pub async fn serve(listener: TcpListener, proxy: JobProxy) -> std::io::Result<()> {
    info!("Proxy server running on http://{}", listener.local_addr()?);
    info!("Use this endpoint: http://{}{GENERATE_QR_PATH}", listener.local_addr()?);
    axum::serve(listener, router(proxy)).await
}

async fn generate_qr(
    State(proxy): State<Arc<JobProxy>>,
    payload: Result<Json<GenerateQrRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected request body: {rejection}");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(rejection.body_text())),
            )
                .into_response();
        }
    };

    let request = match GenerationRequest::new(body.prompt, body.qr_data) {
        Ok(request) => request,
        Err(e) => return GenerationError::from(e).into_response(),
    };

    // Own task: a dropped connection must not cancel a submitted prediction.
    let task = tokio::spawn(async move { proxy.generate(&request).await });
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(join_err) => {
            error!("Generation task died: {join_err}");
            Err(GenerationError::TaskAborted(join_err.to_string()))
        }
    };

    match outcome {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(e) => e.into_response(),
    }
}
