// Wire-level JSON types for the `umbridge` HTTP protocol, shared by the
// worker client and the gateway's own server surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only protocol version this gateway speaks.
pub const PROTOCOL_VERSION: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: f64,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelNameRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupportFlags {
    #[serde(default)]
    pub evaluate: bool,
    #[serde(default)]
    pub gradient: bool,
    #[serde(default)]
    pub apply_jacobian: bool,
    #[serde(default)]
    pub apply_hessian: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub support: SupportFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSizesResponse {
    #[serde(rename = "inputSizes")]
    pub input_sizes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSizesResponse {
    #[serde(rename = "outputSizes")]
    pub output_sizes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub name: String,
    pub input: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub output: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientRequest {
    pub name: String,
    pub out_wrt: usize,
    pub in_wrt: usize,
    pub input: Vec<Vec<f64>>,
    pub sens: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorResponse {
    pub output: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyJacobianRequest {
    pub name: String,
    pub out_wrt: usize,
    pub in_wrt: usize,
    pub input: Vec<Vec<f64>>,
    pub vec: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyHessianRequest {
    pub name: String,
    pub out_wrt: usize,
    pub in_wrt1: usize,
    pub in_wrt2: usize,
    pub input: Vec<Vec<f64>>,
    pub sens: Vec<f64>,
    pub vec: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }
}
