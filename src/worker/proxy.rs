// Implements the model interface by forwarding each operation, on demand,
// through a JobManager-provided transient worker.

use serde_json::Value;
use std::sync::Arc;

use crate::job::JobManager;
use crate::protocol::SupportFlags;
use crate::Error;

/// One allocation per operation: every call to a `WorkerProxy` method
/// submits a fresh job, waits for its worker, proxies exactly one
/// operation, and releases the allocation when the call returns.
///
/// This is deliberate. It keeps each operation's worker lifetime tied to a
/// single call frame (so failure isolation needs no extra bookkeeping) at
/// the cost of one submit-and-wait per call -- acceptable because model
/// evaluations are expected to dominate the wall-clock time of a request.
pub struct WorkerProxy {
    model_name: String,
    manager: Arc<dyn JobManager>,
}

impl WorkerProxy {
    pub fn new(model_name: String, manager: Arc<dyn JobManager>) -> Self {
        Self { model_name, manager }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub async fn input_sizes(&self, config: Option<Value>) -> Result<Vec<usize>, Error> {
        let binding = self.manager.request_model_access(&self.model_name).await?;
        binding.client.input_sizes(config).await
    }

    pub async fn output_sizes(&self, config: Option<Value>) -> Result<Vec<usize>, Error> {
        let binding = self.manager.request_model_access(&self.model_name).await?;
        binding.client.output_sizes(config).await
    }

    pub async fn evaluate(
        &self,
        input: Vec<Vec<f64>>,
        config: Option<Value>,
    ) -> Result<Vec<Vec<f64>>, Error> {
        let binding = self.manager.request_model_access(&self.model_name).await?;
        binding.client.evaluate(input, config).await
    }

    pub async fn gradient(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        config: Option<Value>,
    ) -> Result<Vec<f64>, Error> {
        let binding = self.manager.request_model_access(&self.model_name).await?;
        binding
            .client
            .gradient(out_wrt, in_wrt, input, sens, config)
            .await
    }

    pub async fn apply_jacobian(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        vec: Vec<f64>,
        config: Option<Value>,
    ) -> Result<Vec<f64>, Error> {
        let binding = self.manager.request_model_access(&self.model_name).await?;
        binding
            .client
            .apply_jacobian(out_wrt, in_wrt, input, vec, config)
            .await
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
        let binding = self.manager.request_model_access(&self.model_name).await?;
        binding
            .client
            .apply_hessian(out_wrt, in_wrt1, in_wrt2, input, sens, vec, config)
            .await
    }

    /// Queries all four support flags through a single transient worker
    /// allocation, for the `/ModelInfo` endpoint.
    pub async fn model_info(&self) -> Result<SupportFlags, Error> {
        let binding = self.manager.request_model_access(&self.model_name).await?;
        Ok(SupportFlags {
            evaluate: binding.client.supports_evaluate().await?,
            gradient: binding.client.supports_gradient().await?,
            apply_jacobian: binding.client.supports_apply_jacobian().await?,
            apply_hessian: binding.client.supports_apply_hessian().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::WorkerBinding;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingManager {
        requests: AtomicUsize,
    }

    #[async_trait]
    impl JobManager for CountingManager {
        async fn request_model_access(&self, _model_name: &str) -> Result<WorkerBinding, Error> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Err(Error::SubmitFailed("forward".into()))
        }

        async fn get_model_names(&self) -> Result<Vec<String>, Error> {
            Ok(vec!["forward".to_string()])
        }
    }

    #[tokio::test]
    async fn each_operation_requests_its_own_allocation() {
        let manager = Arc::new(CountingManager {
            requests: AtomicUsize::new(0),
        });
        let proxy = WorkerProxy::new("forward".to_string(), manager.clone());

        let _ = proxy.input_sizes(None).await;
        let _ = proxy.evaluate(vec![vec![1.0]], None).await;

        assert_eq!(manager.requests.load(Ordering::SeqCst), 2);
    }
}
