use berth_core::api::{Empty, VolumeCreateRequest, VolumeInfo, VolumeListResponse, VolumeNameRequest};
use berth_core::{ApiClient, Route};
use clap::Subcommand;
use std::collections::HashMap;

#[derive(Subcommand)]
pub enum VolumeCommands {
    /// Create a named volume
    Create { name: String },
    /// Delete a volume
    Delete { name: String },
    /// List volumes
    List,
    /// Show one volume
    Inspect { name: String },
}

pub async fn handle(
    client: &ApiClient,
    command: VolumeCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        VolumeCommands::Create { name } => {
            let created: VolumeInfo = client
                .call(
                    Route::VolumeCreate,
                    &VolumeCreateRequest {
                        name,
                        labels: HashMap::new(),
                    },
                )
                .await
                .map_err(|e| format!("volume create: {e}"))?;
            println!("{}", created.name);
        }
        VolumeCommands::Delete { name } => {
            let _: Empty = client
                .call(Route::VolumeDelete, &VolumeNameRequest { name })
                .await
                .map_err(|e| format!("volume delete: {e}"))?;
        }
        VolumeCommands::List => {
            let response: VolumeListResponse = client
                .call(Route::VolumeList, &Empty {})
                .await
                .map_err(|e| format!("volume list: {e}"))?;
            println!("{:<20} {}", "NAME", "SOURCE");
            for volume in response.volumes {
                println!("{:<20} {}", volume.name, volume.source.display());
            }
        }
        VolumeCommands::Inspect { name } => {
            let volume: VolumeInfo = client
                .call(Route::VolumeInspect, &VolumeNameRequest { name })
                .await
                .map_err(|e| format!("volume inspect: {e}"))?;
            println!("{}\t{}", volume.name, volume.source.display());
        }
    }
    Ok(())
}
