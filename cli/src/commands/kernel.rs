use crate::commands::print_progress;
use berth_core::api::{GetDefaultKernelRequest, InstallKernelRequest};
use berth_core::{ApiClient, Kernel, Platform, Route};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum KernelCommands {
    /// Install a kernel file or tar archive and make it the default
    Install {
        /// Local path, or a URL when --tar-entry is given
        source: String,
        /// Path of the kernel inside the archive
        #[arg(long)]
        tar_entry: Option<String>,
        /// Target architecture (defaults to the host)
        #[arg(long)]
        arch: Option<String>,
        /// Replace an already installed kernel
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Print the default kernel for an architecture
    Default {
        #[arg(long)]
        arch: Option<String>,
    },
}

pub async fn handle(
    client: &ApiClient,
    command: KernelCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        KernelCommands::Install {
            source,
            tar_entry,
            arch,
            force,
        } => {
            let kernel: Kernel = client
                .call_with_progress(
                    Route::InstallKernel,
                    &InstallKernelRequest {
                        source,
                        tar_entry,
                        architecture: arch,
                        force,
                    },
                    print_progress,
                )
                .await
                .map_err(|e| format!("kernel install: {e}"))?;
            println!("{}", kernel.path.display());
        }
        KernelCommands::Default { arch } => {
            let architecture =
                arch.unwrap_or_else(|| Platform::host_architecture().to_string());
            let kernel: Kernel = client
                .call(Route::GetDefaultKernel, &GetDefaultKernelRequest { architecture })
                .await
                .map_err(|e| format!("kernel default: {e}"))?;
            println!("{}", kernel.path.display());
        }
    }
    Ok(())
}
