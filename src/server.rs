// The gateway's own HTTP surface: it speaks the same `umbridge` protocol a
// worker does, dispatching every operation through a WorkerProxy.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::error;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::protocol::{
    ApplyHessianRequest, ApplyJacobianRequest, ErrorResponse, EvaluateRequest, EvaluateResponse,
    GradientRequest, InfoResponse, InputSizesResponse, ModelInfoResponse, ModelNameRequest,
    OutputSizesResponse, VectorResponse, PROTOCOL_VERSION,
};
use crate::worker::WorkerProxy;
use crate::Error;

/// Shared state for the axum router: one [`WorkerProxy`] per model name,
/// enumerated once at startup.
#[derive(Clone)]
pub struct GatewayState {
    proxies: Arc<BTreeMap<String, Arc<WorkerProxy>>>,
    model_names: Arc<Vec<String>>,
}

impl GatewayState {
    pub fn new(proxies: BTreeMap<String, Arc<WorkerProxy>>) -> Self {
        let model_names = proxies.keys().cloned().collect();
        Self {
            proxies: Arc::new(proxies),
            model_names: Arc::new(model_names),
        }
    }

    fn proxy(&self, name: &str) -> Result<Arc<WorkerProxy>, Error> {
        self.proxies
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))
    }
}

/// Build the router. Handlers run concurrently: axum dispatches each
/// request onto its own task, so multiple operations proxy to independent
/// worker allocations in parallel.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/Info", get(info))
        .route("/ModelInfo", post(model_info))
        .route("/InputSizes", post(input_sizes))
        .route("/OutputSizes", post(output_sizes))
        .route("/Evaluate", post(evaluate))
        .route("/Gradient", post(gradient))
        .route("/ApplyJacobian", post(apply_jacobian))
        .route("/ApplyHessian", post(apply_hessian))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wraps [`Error`] so it can be returned directly from axum handlers.
struct GatewayError(Error);

impl From<Error> for GatewayError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, kind, message) = classify(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }
        (status, Json(ErrorResponse::new(kind, message))).into_response()
    }
}

/// Maps an [`Error`] to the HTTP status and `error.type` the wire protocol
/// expects (spec §6.3, §7).
fn classify(error: &Error) -> (StatusCode, String, String) {
    match error {
        Error::ModelNotFound(name) => (
            StatusCode::BAD_REQUEST,
            "ModelNotFound".to_string(),
            format!("Model '{name}' not supported by this server!"),
        ),
        Error::UnsupportedFeature(_) => (
            StatusCode::BAD_REQUEST,
            "UnsupportedFeature".to_string(),
            error.to_string(),
        ),
        Error::InvalidInput(_) => (
            StatusCode::BAD_REQUEST,
            "InvalidInput".to_string(),
            error.to_string(),
        ),
        Error::WorkerError { kind, message } => {
            let status = match kind.as_str() {
                "ModelNotFound" | "InvalidInput" | "UnsupportedFeature" => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, kind.clone(), message.clone())
        }
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalError".to_string(),
            other.to_string(),
        ),
    }
}

/// `GET /Info`. Idempotent and allocation-free: it serves the model list
/// gathered once at startup.
async fn info(State(state): State<GatewayState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        protocol_version: PROTOCOL_VERSION,
        models: (*state.model_names).clone(),
    })
}

async fn model_info(
    State(state): State<GatewayState>,
    Json(request): Json<ModelNameRequest>,
) -> Result<Json<ModelInfoResponse>, GatewayError> {
    let proxy = state.proxy(&request.name)?;
    let support = proxy.model_info().await?;
    Ok(Json(ModelInfoResponse { support }))
}

async fn input_sizes(
    State(state): State<GatewayState>,
    Json(request): Json<ModelNameRequest>,
) -> Result<Json<InputSizesResponse>, GatewayError> {
    let proxy = state.proxy(&request.name)?;
    let input_sizes = proxy.input_sizes(request.config).await?;
    Ok(Json(InputSizesResponse { input_sizes }))
}

async fn output_sizes(
    State(state): State<GatewayState>,
    Json(request): Json<ModelNameRequest>,
) -> Result<Json<OutputSizesResponse>, GatewayError> {
    let proxy = state.proxy(&request.name)?;
    let output_sizes = proxy.output_sizes(request.config).await?;
    Ok(Json(OutputSizesResponse { output_sizes }))
}

async fn evaluate(
    State(state): State<GatewayState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, GatewayError> {
    let proxy = state.proxy(&request.name)?;
    let output = proxy.evaluate(request.input, request.config).await?;
    Ok(Json(EvaluateResponse { output }))
}

async fn gradient(
    State(state): State<GatewayState>,
    Json(request): Json<GradientRequest>,
) -> Result<Json<VectorResponse>, GatewayError> {
    let proxy = state.proxy(&request.name)?;
    let output = proxy
        .gradient(
            request.out_wrt,
            request.in_wrt,
            request.input,
            request.sens,
            request.config,
        )
        .await?;
    Ok(Json(VectorResponse { output }))
}

async fn apply_jacobian(
    State(state): State<GatewayState>,
    Json(request): Json<ApplyJacobianRequest>,
) -> Result<Json<VectorResponse>, GatewayError> {
    let proxy = state.proxy(&request.name)?;
    let output = proxy
        .apply_jacobian(
            request.out_wrt,
            request.in_wrt,
            request.input,
            request.vec,
            request.config,
        )
        .await?;
    Ok(Json(VectorResponse { output }))
}

async fn apply_hessian(
    State(state): State<GatewayState>,
    Json(request): Json<ApplyHessianRequest>,
) -> Result<Json<VectorResponse>, GatewayError> {
    let proxy = state.proxy(&request.name)?;
    let output = proxy
        .apply_hessian(
            request.out_wrt,
            request.in_wrt1,
            request.in_wrt2,
            request.input,
            request.sens,
            request.vec,
            request.config,
        )
        .await?;
    Ok(Json(VectorResponse { output }))
}
