//! Main application run loop

use std::future::Future;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::controller::Controller;
use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::session::Session;
use crate::errors::ConjureError;

type ControllerHandle = JoinHandle<Result<Session, ConjureError>>;

/// Deploy the session's spell, returning the finished session
pub async fn run(
    options: AppOptions,
    controller: Controller,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<Session, ConjureError> {
    info!("Initializing conjurer...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    let mut controller_handle = init_controller(controller, shutdown_tx.subscribe());

    tokio::select! {
        joined = &mut controller_handle => {
            return joined.map_err(|e| ConjureError::ShutdownError(e.to_string()))?;
        }
        _ = shutdown_signal => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    shutdown_manager.with_controller_handle(controller_handle)?;
    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

fn init_controller(
    controller: Controller,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> ControllerHandle {
    info!("Starting deployment controller...");
    tokio::spawn(controller.run(Box::pin(async move {
        let _ = shutdown_rx.recv().await;
    })))
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    controller_handle: Option<ControllerHandle>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            controller_handle: None,
        }
    }

    pub fn with_controller_handle(&mut self, handle: ControllerHandle) -> Result<(), ConjureError> {
        if self.controller_handle.is_some() {
            return Err(ConjureError::ShutdownError("controller_handle already set".to_string()));
        }
        self.controller_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<Session, ConjureError> {
        let _ = self.shutdown_tx.send(());

        let Some(mut handle) = self.controller_handle.take() else {
            return Err(ConjureError::ShutdownError("no controller to shut down".to_string()));
        };

        match tokio::time::timeout(self.lifecycle_options.max_shutdown_delay, &mut handle).await {
            Ok(joined) => {
                info!("Shutdown complete");
                joined.map_err(|e| ConjureError::ShutdownError(e.to_string()))?
            }
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, aborting controller...",
                    self.lifecycle_options.max_shutdown_delay
                );
                handle.abort();
                Err(ConjureError::ShutdownError("shutdown timed out".to_string()))
            }
        }
    }
}
