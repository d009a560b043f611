mod services;

use berth_container::{ConfigurationPipeline, ContainerService, HelperRuntime};
use berth_core::approot;
use berth_core::{ApiServer, Router};
use berth_dns::{CompositeResolver, DnsServer, HostsResolver, Resolver, DNS_LISTEN_ADDR};
use berth_image::ImageService;
use berth_kernel::KernelService;
use berth_network::NetworkService;
use berth_plugin::{PluginLoader, PluginService};
use berth_store::ImageStore;
use berth_volume::VolumeService;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "berth-daemon")]
#[command(about = "berth API daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API daemon
    Start {
        /// Application data root (default: user application-support dir,
        /// overridable with BERTH_APP_ROOT)
        #[arg(long)]
        app_root: Option<PathBuf>,

        /// Log at debug level
        #[arg(long)]
        debug: bool,

        /// Default DNS domain for container hostnames
        #[arg(long, default_value = "berth.internal")]
        dns_domain: String,

        /// Address the embedded DNS server listens on
        #[arg(long, default_value = DNS_LISTEN_ADDR)]
        dns_listen: String,

        /// Maximum number of parallel blob downloads
        #[arg(long, default_value_t = 3)]
        max_concurrent_downloads: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            app_root,
            debug,
            dns_domain,
            dns_listen,
            max_concurrent_downloads,
        } => {
            let default_filter = if debug { "debug" } else { "info,berth=debug" };
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(default_filter)),
                )
                .init();

            let app_root = app_root.unwrap_or_else(approot::app_root);
            tokio::fs::create_dir_all(&app_root).await?;
            tracing::info!(app_root = %app_root.display(), "starting daemon");

            // Plugins come up first so booted plugins are available to
            // every service.
            let loader = Arc::new(PluginLoader::new(plugin_directories(&app_root)));
            let plugins = Arc::new(PluginService::new(loader.clone()));
            plugins.boot_plugins().await?;

            tracing::info!("initializing services");
            let store = Arc::new(ImageStore::new(app_root.join("content")).await?);
            let images = Arc::new(ImageService::new(store, max_concurrent_downloads));
            let kernels = Arc::new(KernelService::new(&app_root).await?);
            let networks = Arc::new(NetworkService::new(&app_root).await?);
            let volumes = Arc::new(VolumeService::new(&app_root).await?);

            let pipeline = ConfigurationPipeline::new(
                images.clone(),
                kernels.clone(),
                networks.clone(),
                volumes.clone(),
                Some(dns_domain),
            );
            let runtime = Arc::new(HelperRuntime::new(loader));
            let containers = Arc::new(
                ContainerService::new(&app_root, pipeline, runtime, networks.clone()).await?,
            );

            // The route table is complete before either server listens.
            let mut router = Router::new();
            services::register_containers(&mut router, containers);
            services::register_networks(&mut router, networks.clone());
            services::register_volumes(&mut router, volumes);
            services::register_kernel(&mut router, kernels);
            services::register_plugins(&mut router, plugins);
            services::register_health(&mut router);
            tracing::info!(routes = router.len(), "route table built");

            networks.ensure_default().await?;

            let api_server = ApiServer::new(approot::api_socket_path(&app_root), Arc::new(router));

            let hosts_resolver: Arc<dyn Resolver> = Arc::new(HostsResolver::new(networks.hosts()));
            let resolver = Arc::new(CompositeResolver::new(vec![hosts_resolver]));
            let dns_server = DnsServer::bind(&dns_listen, resolver).await?;

            tokio::select! {
                result = api_server.serve() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "API server failed");
                    }
                }
                result = dns_server.serve() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "DNS server failed");
                    }
                }
            }
            std::process::exit(1);
        }
    }
}

/// Plugin scan order: user plugins under the app root, the application
/// bundle, then the install-root libexec directory. Missing directories
/// are filtered by the loader.
fn plugin_directories(app_root: &std::path::Path) -> Vec<PathBuf> {
    let mut dirs = vec![app_root.join("plugins")];
    if let Ok(exe) = std::env::current_exe() {
        if let Some(bin_dir) = exe.parent() {
            dirs.push(bin_dir.join("../PlugIns"));
            dirs.push(bin_dir.join("../libexec/berth/plugins"));
        }
    }
    dirs
}
