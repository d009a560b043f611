use berth_core::api::{GetDefaultKernelRequest, InstallKernelRequest};
use berth_core::{Platform, Route, Router};
use berth_kernel::KernelService;
use berth_progress::ProgressCoordinator;
use std::path::Path;
use std::sync::Arc;

pub fn register_kernel(router: &mut Router, kernels: Arc<KernelService>) {
    let svc = kernels.clone();
    router.route(
        Route::InstallKernel,
        move |request: InstallKernelRequest, progress| {
            let svc = svc.clone();
            async move {
                let architecture = request
                    .architecture
                    .unwrap_or_else(|| Platform::host_architecture().to_string());

                let coordinator = ProgressCoordinator::new(progress);
                let task = coordinator.task();
                let kernel = match &request.tar_entry {
                    Some(entry) => {
                        svc.install_from_tar(
                            &request.source,
                            entry,
                            &architecture,
                            request.force,
                            &task,
                        )
                        .await?
                    }
                    None => {
                        svc.install_from_file(
                            Path::new(&request.source),
                            &architecture,
                            request.force,
                        )
                        .await?
                    }
                };
                Ok(kernel)
            }
        },
    );

    let svc = kernels;
    router.route(
        Route::GetDefaultKernel,
        move |request: GetDefaultKernelRequest, _progress| {
            let svc = svc.clone();
            async move { Ok(svc.get_default(&request.architecture).await?) }
        },
    );
}
