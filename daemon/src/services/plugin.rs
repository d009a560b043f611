use berth_core::api::{Empty, PluginListResponse, PluginNameRequest};
use berth_core::{Route, Router};
use berth_plugin::PluginService;
use std::sync::Arc;

pub fn register_plugins(router: &mut Router, plugins: Arc<PluginService>) {
    let svc = plugins.clone();
    router.route(Route::PluginGet, move |request: PluginNameRequest, _progress| {
        let svc = svc.clone();
        async move { Ok(svc.get(&request.name).await?) }
    });

    let svc = plugins.clone();
    router.route(Route::PluginList, move |_request: Empty, _progress| {
        let svc = svc.clone();
        async move {
            Ok(PluginListResponse {
                plugins: svc.list().await?,
            })
        }
    });

    let svc = plugins.clone();
    router.route(Route::PluginLoad, move |request: PluginNameRequest, _progress| {
        let svc = svc.clone();
        async move {
            svc.load(&request.name).await?;
            Ok(Empty {})
        }
    });

    let svc = plugins.clone();
    router.route(
        Route::PluginUnload,
        move |request: PluginNameRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.unload(&request.name).await?;
                Ok(Empty {})
            }
        },
    );

    let svc = plugins;
    router.route(
        Route::PluginRestart,
        move |request: PluginNameRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.restart(&request.name).await?;
                Ok(Empty {})
            }
        },
    );
}
