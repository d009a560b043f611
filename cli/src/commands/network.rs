use berth_core::api::{
    Empty, NetworkCreateRequest, NetworkIdRequest, NetworkListResponse, NetworkMode, NetworkStatus,
};
use berth_core::{ApiClient, Route};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum NetworkCommands {
    /// Create a NAT network
    Create { id: String },
    /// Delete a network
    Delete { id: String },
    /// List networks
    List,
}

pub async fn handle(
    client: &ApiClient,
    command: NetworkCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        NetworkCommands::Create { id } => {
            let created: NetworkStatus = client
                .call(
                    Route::NetworkCreate,
                    &NetworkCreateRequest {
                        id,
                        mode: NetworkMode::Nat,
                    },
                )
                .await
                .map_err(|e| format!("network create: {e}"))?;
            println!("{}", created.id);
        }
        NetworkCommands::Delete { id } => {
            let _: Empty = client
                .call(Route::NetworkDelete, &NetworkIdRequest { id })
                .await
                .map_err(|e| format!("network delete: {e}"))?;
        }
        NetworkCommands::List => {
            let response: NetworkListResponse = client
                .call(Route::NetworkList, &Empty {})
                .await
                .map_err(|e| format!("network list: {e}"))?;
            println!("{:<16} {:<10} {}", "ID", "STATE", "SUBNET");
            for network in response.networks {
                let state = match network.state {
                    berth_core::api::NetworkState::Running => "running",
                    berth_core::api::NetworkState::Created => "created",
                };
                println!("{:<16} {:<10} {}", network.id, state, network.subnet);
            }
        }
    }
    Ok(())
}
