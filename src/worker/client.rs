// Client-side model, connecting to a worker that a JobManager just stood up.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::protocol::{
    ApplyHessianRequest, ApplyJacobianRequest, EvaluateRequest, EvaluateResponse,
    GradientRequest, InfoResponse, InputSizesResponse, ModelInfoResponse, ModelNameRequest,
    OutputSizesResponse, SupportFlags, VectorResponse,
};
use crate::Error;

/// The read timeout configured on every worker request.
///
/// Model evaluations are expected to run for as long as the underlying
/// compute does; this is deliberately generous rather than a guess at a
/// "reasonable" evaluation time.
const WORKER_READ_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// An HTTP client bound to one worker's URL and one model name.
///
/// Mirrors `umbridge::HTTPModel` from the reference implementation, minus
/// its POSIX shared-memory fast path (out of scope for a gateway that
/// proxies across job allocations rather than co-located processes).
#[derive(Clone)]
pub struct WorkerClient {
    base_url: String,
    model_name: String,
    http: reqwest::Client,
}

impl WorkerClient {
    pub fn new(base_url: &str, model_name: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(WORKER_READ_TIMEOUT)
            .build()
            .expect("reqwest client configuration is valid");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name: model_name.to_string(),
            http,
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, Error> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;

        let bytes = response.bytes().await?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|_| Error::WorkerProtocolError(String::from_utf8_lossy(&bytes).into_owned()))?;

        if let Some(error) = value.get("error") {
            let kind = error
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("WorkerError")
                .to_string();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("worker reported an error")
                .to_string();
            return Err(Error::WorkerError { kind, message });
        }

        serde_json::from_value(value).map_err(Error::from)
    }

    /// `GET /Info`: the worker's model names and protocol version.
    pub async fn get_info(&self) -> Result<Vec<String>, Error> {
        let response = self
            .http
            .get(format!("{}/Info", self.base_url))
            .send()
            .await?;
        let info: InfoResponse = response.json().await?;
        Ok(info.models)
    }

    async fn model_info(&self) -> Result<SupportFlags, Error> {
        let request = ModelNameRequest {
            name: self.model_name.clone(),
            config: None,
        };
        let response: ModelInfoResponse = self.post("/ModelInfo", &request).await?;
        Ok(response.support)
    }

    pub async fn input_sizes(&self, config: Option<Value>) -> Result<Vec<usize>, Error> {
        let request = ModelNameRequest {
            name: self.model_name.clone(),
            config,
        };
        let response: InputSizesResponse = self.post("/InputSizes", &request).await?;
        Ok(response.input_sizes)
    }

    pub async fn output_sizes(&self, config: Option<Value>) -> Result<Vec<usize>, Error> {
        let request = ModelNameRequest {
            name: self.model_name.clone(),
            config,
        };
        let response: OutputSizesResponse = self.post("/OutputSizes", &request).await?;
        Ok(response.output_sizes)
    }

    pub async fn evaluate(
        &self,
        input: Vec<Vec<f64>>,
        config: Option<Value>,
    ) -> Result<Vec<Vec<f64>>, Error> {
        let request = EvaluateRequest {
            name: self.model_name.clone(),
            input,
            config,
        };
        let response: EvaluateResponse = self.post("/Evaluate", &request).await?;
        Ok(response.output)
    }

    pub async fn gradient(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        config: Option<Value>,
    ) -> Result<Vec<f64>, Error> {
        let request = GradientRequest {
            name: self.model_name.clone(),
            out_wrt,
            in_wrt,
            input,
            sens,
            config,
        };
        let response: VectorResponse = self.post("/Gradient", &request).await?;
        Ok(response.output)
    }

    pub async fn apply_jacobian(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        vec: Vec<f64>,
        config: Option<Value>,
    ) -> Result<Vec<f64>, Error> {
        let request = ApplyJacobianRequest {
            name: self.model_name.clone(),
            out_wrt,
            in_wrt,
            input,
            vec,
            config,
        };
        let response: VectorResponse = self.post("/ApplyJacobian", &request).await?;
        Ok(response.output)
    }

    pub async fn apply_hessian(
        &self,
        out_wrt: usize,
        in_wrt1: usize,
        in_wrt2: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        vec: Vec<f64>,
        config: Option<Value>,
    ) -> Result<Vec<f64>, Error> {
        let request = ApplyHessianRequest {
            name: self.model_name.clone(),
            out_wrt,
            in_wrt1,
            in_wrt2,
            input,
            sens,
            vec,
            config,
        };
        let response: VectorResponse = self.post("/ApplyHessian", &request).await?;
        Ok(response.output)
    }

    pub async fn supports_evaluate(&self) -> Result<bool, Error> {
        Ok(self.model_info().await?.evaluate)
    }

    pub async fn supports_gradient(&self) -> Result<bool, Error> {
        Ok(self.model_info().await?.gradient)
    }

    pub async fn supports_apply_jacobian(&self) -> Result<bool, Error> {
        Ok(self.model_info().await?.apply_jacobian)
    }

    pub async fn supports_apply_hessian(&self) -> Result<bool, Error> {
        Ok(self.model_info().await?.apply_hessian)
    }
}
