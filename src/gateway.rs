// Wires together job submission, rendezvous, and the HTTP surface into a
// running gateway process.

use log::info;
use path_absolutize::Absolutize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cli::Options;
use crate::command::ShellCommandRunner;
use crate::job::{CommandJobManager, FileCommunicatorFactory, JobManager, JobScriptLocator, JobSubmitter};
use crate::rendezvous;
use crate::server::{self, GatewayState};
use crate::worker::WorkerProxy;
use crate::Error;

/// Run the gateway to completion: build every collaborator from `options`,
/// enumerate the worker image's models, serve, and block until a shutdown
/// signal arrives.
///
/// # Errors
/// Returns [`Error::ConfigError`] for scheduler-specific option combinations
/// that cannot be resolved, and any error surfaced while preparing the
/// rendezvous directory or enumerating models.
pub async fn run(options: Options) -> Result<(), Error> {
    std::fs::create_dir_all(&options.rendezvous_dir)
        .map_err(|e| Error::DirectoryCreate(options.rendezvous_dir.clone(), e))?;

    // Job scripts run on a scheduler-managed node with its own working
    // directory, so paths embedded in submit commands and job environments
    // must be absolute.
    let rendezvous_dir = options.rendezvous_dir.absolutize()?.into_owned();
    let script_dir = options.script_dir.absolutize()?.into_owned();

    rendezvous::purge_stale_files(&rendezvous_dir)?;

    if let Some(script) = &options.queue_bootstrap_script {
        bootstrap_queue(script)?;
    }

    let runner = Arc::new(ShellCommandRunner);
    let submitter = Arc::new(JobSubmitter::new(
        options.scheduler,
        runner,
        options.batch_submit.clone(),
        options.batch_cancel.clone(),
        options.queue_submit.clone(),
        options.queue_cancel.clone(),
        options.submission_delay(),
        options.num_server,
    ));

    let communicator_factory = Arc::new(FileCommunicatorFactory::new(
        rendezvous_dir,
        options.poll_interval(),
    )?);

    let locator = Arc::new(JobScriptLocator::new(
        script_dir,
        options.default_script.clone(),
        options.script_prefix.clone(),
        options.script_suffix.clone(),
    ));

    let manager: Arc<CommandJobManager> = Arc::new(CommandJobManager::new(
        submitter,
        communicator_factory,
        locator.clone(),
    ));

    info!("Enumerating models served by the worker image.");
    let model_names = manager.get_model_names().await?;
    info!("Worker image serves {} model(s): {model_names:?}.", model_names.len());
    locator.warn_unmatched_scripts(&model_names);

    let mut proxies: BTreeMap<String, Arc<WorkerProxy>> = BTreeMap::new();
    for name in &model_names {
        proxies.insert(
            name.clone(),
            Arc::new(WorkerProxy::new(name.clone(), manager.clone())),
        );
    }

    let state = GatewayState::new(proxies);
    let router = server::router(state);

    let port = options.effective_port();
    let address = format!("{}:{port}", options.host);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on {address}.");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete.");
    Ok(())
}

/// Launches the operator-supplied script that brings up a `queue` scheduler's
/// own server process and allocation queue before any worker jobs are
/// submitted to it. Fire-and-forget: the script is expected to background
/// itself.
fn bootstrap_queue(script: &std::path::Path) -> Result<(), Error> {
    info!("Bootstrapping task-queue scheduler via '{}'.", script.display());
    std::process::Command::new(script)
        .spawn()
        .map_err(|e| Error::SpawnFailed(script.display().to_string(), e))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, finishing in-flight requests.");
}
