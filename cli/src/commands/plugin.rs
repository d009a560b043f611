use berth_core::api::{Empty, PluginInfo, PluginListResponse, PluginNameRequest};
use berth_core::{ApiClient, Route};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum PluginCommands {
    /// Show one plugin
    Get { name: String },
    /// List discovered plugins
    List,
    /// Launch a plugin
    Load { name: String },
    /// Stop a running plugin
    Unload { name: String },
    /// Restart a plugin
    Restart { name: String },
}

pub async fn handle(
    client: &ApiClient,
    command: PluginCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        PluginCommands::Get { name } => {
            let plugin: PluginInfo = client
                .call(Route::PluginGet, &PluginNameRequest { name })
                .await
                .map_err(|e| format!("plugin get: {e}"))?;
            println!(
                "{}\t{}\t{}",
                plugin.name,
                if plugin.loaded { "loaded" } else { "stopped" },
                plugin.summary
            );
        }
        PluginCommands::List => {
            let response: PluginListResponse = client
                .call(Route::PluginList, &Empty {})
                .await
                .map_err(|e| format!("plugin list: {e}"))?;
            println!("{:<24} {:<8} {}", "NAME", "STATE", "ABSTRACT");
            for plugin in response.plugins {
                println!(
                    "{:<24} {:<8} {}",
                    plugin.name,
                    if plugin.loaded { "loaded" } else { "stopped" },
                    plugin.summary
                );
            }
        }
        PluginCommands::Load { name } => {
            let _: Empty = client
                .call(Route::PluginLoad, &PluginNameRequest { name })
                .await
                .map_err(|e| format!("plugin load: {e}"))?;
        }
        PluginCommands::Unload { name } => {
            let _: Empty = client
                .call(Route::PluginUnload, &PluginNameRequest { name })
                .await
                .map_err(|e| format!("plugin unload: {e}"))?;
        }
        PluginCommands::Restart { name } => {
            let _: Empty = client
                .call(Route::PluginRestart, &PluginNameRequest { name })
                .await
                .map_err(|e| format!("plugin restart: {e}"))?;
        }
    }
    Ok(())
}
