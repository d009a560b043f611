use berth_core::api::{Empty, NetworkCreateRequest, NetworkIdRequest, NetworkListResponse};
use berth_core::{Route, Router};
use berth_network::NetworkService;
use std::sync::Arc;

pub fn register_networks(router: &mut Router, networks: Arc<NetworkService>) {
    let svc = networks.clone();
    router.route(
        Route::NetworkCreate,
        move |request: NetworkCreateRequest, _progress| {
            let svc = svc.clone();
            async move { Ok(svc.create(&request.id, request.mode).await?) }
        },
    );

    let svc = networks.clone();
    router.route(
        Route::NetworkDelete,
        move |request: NetworkIdRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.delete(&request.id).await?;
                Ok(Empty {})
            }
        },
    );

    let svc = networks;
    router.route(Route::NetworkList, move |_request: Empty, _progress| {
        let svc = svc.clone();
        async move {
            Ok(NetworkListResponse {
                networks: svc.list().await,
            })
        }
    });
}
