mod commands;
mod flags;

use berth_core::approot;
use berth_core::ApiClient;
use clap::{Parser, Subcommand};
use commands::{container, health, kernel, network, plugin, run, volume};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "berth - run OCI images as lightweight VMs")]
struct Cli {
    /// Application data root of the daemon to talk to
    #[arg(long, global = true)]
    app_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a container and run it to completion
    Run(flags::RunArgs),
    /// Create a container without starting it
    Create(flags::RunArgs),
    /// Manage containers
    #[command(subcommand)]
    Container(container::ContainerCommands),
    /// Manage networks
    #[command(subcommand)]
    Network(network::NetworkCommands),
    /// Manage volumes
    #[command(subcommand)]
    Volume(volume::VolumeCommands),
    /// Manage kernels
    #[command(subcommand)]
    Kernel(kernel::KernelCommands),
    /// Manage plugins
    #[command(subcommand)]
    Plugin(plugin::PluginCommands),
    /// Manage the build container
    #[command(subcommand)]
    Builder(container::BuilderCommands),
    /// Check that the daemon is up
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app_root = cli.app_root.clone().unwrap_or_else(approot::app_root);
    let client = ApiClient::new(approot::api_socket_path(&app_root));

    let result = match cli.command {
        Commands::Run(args) => run::run(&client, args, true).await,
        Commands::Create(args) => run::run(&client, args, false).await,
        Commands::Container(command) => container::handle(&client, command).await,
        Commands::Network(command) => network::handle(&client, command).await,
        Commands::Volume(command) => volume::handle(&client, command).await,
        Commands::Kernel(command) => kernel::handle(&client, command).await,
        Commands::Plugin(command) => plugin::handle(&client, command).await,
        Commands::Builder(command) => container::handle_builder(&client, command).await,
        Commands::Health => health::ping(&client).await,
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
