use berth_core::api::{
    DeleteContainerRequest, Empty, KillRequest, ListContainersResponse, LogsRequest, LogsResponse,
    StopContainerRequest,
};
use berth_core::{ApiClient, ClientError, ErrorKind, Route};
use clap::Subcommand;

/// Container id of the build helper.
const BUILDER_ID: &str = "buildkit";

#[derive(Subcommand)]
pub enum ContainerCommands {
    /// List containers
    List,
    /// Stop a running container
    Stop {
        id: String,
        /// Seconds to wait before the stop turns into a kill
        #[arg(long)]
        timeout: Option<u32>,
    },
    /// Send a signal to a running container
    Kill {
        id: String,
        #[arg(long, default_value = "SIGKILL")]
        signal: String,
    },
    /// Delete a container
    Delete {
        id: String,
        /// Delete even while running
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Print a container's console log
    Logs {
        id: String,
        /// Only the last N lines
        #[arg(long)]
        tail: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum BuilderCommands {
    /// Delete the build container if it exists
    Delete {
        #[arg(long, short = 'f')]
        force: bool,
    },
}

pub async fn handle(
    client: &ApiClient,
    command: ContainerCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ContainerCommands::List => {
            let response: ListContainersResponse = client
                .call(Route::ContainerList, &Empty {})
                .await
                .map_err(|e| format!("list: {e}"))?;
            println!("{:<16} {:<12} {}", "ID", "STATUS", "IMAGE");
            for container in response.containers {
                println!(
                    "{:<16} {:<12} {}",
                    container.id, container.status, container.image
                );
            }
        }
        ContainerCommands::Stop { id, timeout } => {
            let _: Empty = client
                .call(
                    Route::ContainerStop,
                    &StopContainerRequest {
                        id,
                        timeout_seconds: timeout,
                    },
                )
                .await
                .map_err(|e| format!("stop: {e}"))?;
        }
        ContainerCommands::Kill { id, signal } => {
            let _: Empty = client
                .call(Route::ContainerKill, &KillRequest { id, signal })
                .await
                .map_err(|e| format!("kill: {e}"))?;
        }
        ContainerCommands::Delete { id, force } => {
            let _: Empty = client
                .call(Route::ContainerDelete, &DeleteContainerRequest { id, force })
                .await
                .map_err(|e| format!("delete: {e}"))?;
        }
        ContainerCommands::Logs { id, tail } => {
            let response: LogsResponse = client
                .call(Route::ContainerLogs, &LogsRequest { id, tail })
                .await
                .map_err(|e| format!("logs: {e}"))?;
            for line in response.lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub async fn handle_builder(
    client: &ApiClient,
    command: BuilderCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        BuilderCommands::Delete { force } => {
            let result: Result<Empty, ClientError> = client
                .call(
                    Route::ContainerDelete,
                    &DeleteContainerRequest {
                        id: BUILDER_ID.to_string(),
                        force,
                    },
                )
                .await;
            match result {
                Ok(_) => Ok(()),
                // A builder that was never created is not an error.
                Err(ClientError::Api(e)) if e.kind == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(format!("builder delete: {e}").into()),
            }
        }
    }
}
