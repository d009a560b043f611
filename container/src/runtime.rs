//! The seam to the external per-container VM runtime.
//!
//! The daemon never boots a VM itself. It launches the runtime helper
//! plugin once per container and forwards lifecycle operations to the
//! helper's socket, which speaks the same framed route protocol as the
//! daemon's own API.

use crate::error::ContainerError;
use async_trait::async_trait;
use berth_core::api::{
    CreateProcessRequest, DialRequest, DialResponse, Empty, KillRequest, ResizeRequest,
    StartProcessRequest, StopContainerRequest, WaitRequest, WaitResponse,
};
use berth_core::{ApiClient, ContainerConfiguration, Kernel, ProcessConfiguration, Route};
use berth_plugin::PluginLoader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Name of the plugin that boots and supervises one container VM.
pub const RUNTIME_PLUGIN: &str = "berth-runtime-linux";

const RUNTIME_SOCKET: &str = "runtime.sock";

#[async_trait]
pub trait Runtime: Send + Sync {
    /// Boots the container VM for a created configuration.
    async fn bootstrap(
        &self,
        config: &ContainerConfiguration,
        kernel: &Kernel,
        container_dir: &Path,
    ) -> Result<(), ContainerError>;

    async fn stop(&self, id: &str, timeout_seconds: Option<u32>) -> Result<(), ContainerError>;
    async fn kill(&self, id: &str, signal: &str) -> Result<(), ContainerError>;
    async fn wait(&self, id: &str, process_id: Option<&str>) -> Result<i64, ContainerError>;
    async fn resize(
        &self,
        id: &str,
        process_id: Option<&str>,
        columns: u16,
        rows: u16,
    ) -> Result<(), ContainerError>;
    async fn create_process(
        &self,
        id: &str,
        process_id: &str,
        process: &ProcessConfiguration,
    ) -> Result<(), ContainerError>;
    async fn start_process(&self, id: &str, process_id: &str) -> Result<(), ContainerError>;

    /// Opens a bridge to a guest vsock port; returns the host socket.
    async fn dial(&self, id: &str, port: u32) -> Result<PathBuf, ContainerError>;
}

/// Production runtime: one helper plugin process per container.
pub struct HelperRuntime {
    loader: Arc<PluginLoader>,
    helpers: Mutex<HashMap<String, Helper>>,
}

struct Helper {
    child: Child,
    socket: PathBuf,
}

impl HelperRuntime {
    pub fn new(loader: Arc<PluginLoader>) -> Self {
        Self {
            loader,
            helpers: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, id: &str) -> Result<ApiClient, ContainerError> {
        let helpers = self.helpers.lock().await;
        let helper = helpers
            .get(id)
            .ok_or_else(|| ContainerError::InvalidState(format!("container not running: {id}")))?;
        Ok(ApiClient::new(&helper.socket))
    }

    async fn forward<Req, Resp>(
        &self,
        id: &str,
        route: Route,
        request: &Req,
    ) -> Result<Resp, ContainerError>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        self.client(id)
            .await?
            .call(route, request)
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))
    }
}

#[async_trait]
impl Runtime for HelperRuntime {
    async fn bootstrap(
        &self,
        config: &ContainerConfiguration,
        kernel: &Kernel,
        container_dir: &Path,
    ) -> Result<(), ContainerError> {
        let plugin = self.loader.find_plugin(RUNTIME_PLUGIN).ok_or_else(|| {
            ContainerError::InvalidState(format!("runtime plugin {RUNTIME_PLUGIN} is not installed"))
        })?;

        let socket = container_dir.join(RUNTIME_SOCKET);
        let mut command = Command::new(&plugin.binary);
        command
            .args(&plugin.config.default_arguments)
            .arg("--root")
            .arg(container_dir)
            .arg("--socket")
            .arg(&socket)
            .arg("--kernel")
            .arg(&kernel.path)
            .kill_on_drop(true);

        tracing::info!(container = %config.id, helper = %plugin.binary.display(), "launching runtime helper");
        let child = command.spawn().map_err(|e| {
            ContainerError::Runtime(format!("failed to launch {RUNTIME_PLUGIN}: {e}"))
        })?;

        // The helper owns the socket; wait for it to come up.
        for _ in 0..100 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if !socket.exists() {
            return Err(ContainerError::Runtime(
                "runtime helper did not publish its socket".to_string(),
            ));
        }

        self.helpers.lock().await.insert(
            config.id.clone(),
            Helper {
                child,
                socket: socket.clone(),
            },
        );

        let client = ApiClient::new(&socket);
        client
            .call::<_, Empty>(Route::ContainerBootstrap, config)
            .await
            .map_err(|e| ContainerError::Runtime(e.to_string()))?;
        Ok(())
    }

    async fn stop(&self, id: &str, timeout_seconds: Option<u32>) -> Result<(), ContainerError> {
        let result: Result<Empty, _> = self
            .forward(
                id,
                Route::ContainerStop,
                &StopContainerRequest {
                    id: id.to_string(),
                    timeout_seconds,
                },
            )
            .await;
        result?;

        if let Some(mut helper) = self.helpers.lock().await.remove(id) {
            let _ = helper.child.wait().await;
        }
        Ok(())
    }

    async fn kill(&self, id: &str, signal: &str) -> Result<(), ContainerError> {
        let result: Result<Empty, _> = self
            .forward(
                id,
                Route::ContainerKill,
                &KillRequest {
                    id: id.to_string(),
                    signal: signal.to_string(),
                },
            )
            .await;
        // The helper may die before replying to its own kill.
        if result.is_err() {
            if let Some(mut helper) = self.helpers.lock().await.remove(id) {
                let _ = helper.child.kill().await;
            }
            return Ok(());
        }
        if let Some(mut helper) = self.helpers.lock().await.remove(id) {
            let _ = helper.child.wait().await;
        }
        Ok(())
    }

    async fn wait(&self, id: &str, process_id: Option<&str>) -> Result<i64, ContainerError> {
        let response: WaitResponse = self
            .forward(
                id,
                Route::ContainerWait,
                &WaitRequest {
                    id: id.to_string(),
                    process_id: process_id.map(str::to_string),
                },
            )
            .await?;
        Ok(response.exit_code)
    }

    async fn resize(
        &self,
        id: &str,
        process_id: Option<&str>,
        columns: u16,
        rows: u16,
    ) -> Result<(), ContainerError> {
        let _: Empty = self
            .forward(
                id,
                Route::ContainerResize,
                &ResizeRequest {
                    id: id.to_string(),
                    process_id: process_id.map(str::to_string),
                    columns,
                    rows,
                },
            )
            .await?;
        Ok(())
    }

    async fn create_process(
        &self,
        id: &str,
        process_id: &str,
        process: &ProcessConfiguration,
    ) -> Result<(), ContainerError> {
        let _: Empty = self
            .forward(
                id,
                Route::ContainerCreateProcess,
                &CreateProcessRequest {
                    id: id.to_string(),
                    process_id: process_id.to_string(),
                    process: process.clone(),
                },
            )
            .await?;
        Ok(())
    }

    async fn start_process(&self, id: &str, process_id: &str) -> Result<(), ContainerError> {
        let _: Empty = self
            .forward(
                id,
                Route::ContainerStartProcess,
                &StartProcessRequest {
                    id: id.to_string(),
                    process_id: process_id.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn dial(&self, id: &str, port: u32) -> Result<PathBuf, ContainerError> {
        let response: DialResponse = self
            .forward(
                id,
                Route::ContainerDial,
                &DialRequest {
                    id: id.to_string(),
                    port,
                },
            )
            .await?;
        Ok(response.socket_path)
    }
}

// The helper writes the guest console here; the service reads it back
// for the logs route without needing a live helper.
pub(crate) fn logs_path(container_dir: &Path) -> PathBuf {
    container_dir.join("console.log")
}
