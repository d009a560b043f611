use berth_core::api::{Empty, VolumeCreateRequest, VolumeListResponse, VolumeNameRequest};
use berth_core::{Route, Router};
use berth_volume::VolumeService;
use std::sync::Arc;

pub fn register_volumes(router: &mut Router, volumes: Arc<VolumeService>) {
    let svc = volumes.clone();
    router.route(
        Route::VolumeCreate,
        move |request: VolumeCreateRequest, _progress| {
            let svc = svc.clone();
            async move { Ok(svc.create(&request.name, request.labels).await?) }
        },
    );

    let svc = volumes.clone();
    router.route(
        Route::VolumeDelete,
        move |request: VolumeNameRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.delete(&request.name).await?;
                Ok(Empty {})
            }
        },
    );

    let svc = volumes.clone();
    router.route(Route::VolumeList, move |_request: Empty, _progress| {
        let svc = svc.clone();
        async move {
            Ok(VolumeListResponse {
                volumes: svc.list().await,
            })
        }
    });

    let svc = volumes;
    router.route(
        Route::VolumeInspect,
        move |request: VolumeNameRequest, _progress| {
            let svc = svc.clone();
            async move { Ok(svc.inspect(&request.name).await?) }
        },
    );
}
