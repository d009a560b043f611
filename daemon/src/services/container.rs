use berth_container::ContainerService;
use berth_core::api::{
    ContainerIdRequest, CreateContainerRequest, CreateProcessRequest, DeleteContainerRequest,
    DialRequest, DialResponse, Empty, KillRequest, ListContainersResponse, LogsRequest,
    LogsResponse, ResizeRequest, StartProcessRequest, StopContainerRequest, WaitRequest,
    WaitResponse,
};
use berth_core::{ApiError, Route, Router};
use berth_remote::RegistryClient;
use std::sync::Arc;

pub fn register_containers(router: &mut Router, containers: Arc<ContainerService>) {
    let svc = containers.clone();
    router.route(
        Route::ContainerCreate,
        move |request: CreateContainerRequest, progress| {
            let svc = svc.clone();
            async move {
                let registry = Arc::new(
                    RegistryClient::new(request.registry.scheme)
                        .map_err(|e| ApiError::internal(e.to_string()))?,
                );
                Ok(svc.create(&registry, &request, progress).await?)
            }
        },
    );

    let svc = containers.clone();
    router.route(Route::ContainerList, move |_request: Empty, _progress| {
        let svc = svc.clone();
        async move {
            Ok(ListContainersResponse {
                containers: svc.list().await,
            })
        }
    });

    let svc = containers.clone();
    router.route(
        Route::ContainerDelete,
        move |request: DeleteContainerRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.delete(&request.id, request.force).await?;
                Ok(Empty {})
            }
        },
    );

    let svc = containers.clone();
    router.route(Route::ContainerLogs, move |request: LogsRequest, _progress| {
        let svc = svc.clone();
        async move {
            Ok(LogsResponse {
                lines: svc.logs(&request.id, request.tail).await?,
            })
        }
    });

    let svc = containers.clone();
    router.route(
        Route::ContainerBootstrap,
        move |request: ContainerIdRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.bootstrap(&request.id).await?;
                Ok(Empty {})
            }
        },
    );

    let svc = containers.clone();
    router.route(Route::ContainerDial, move |request: DialRequest, _progress| {
        let svc = svc.clone();
        async move {
            let socket_path = svc.dial(&request.id, request.port).await?;
            Ok(DialResponse { socket_path })
        }
    });

    let svc = containers.clone();
    router.route(
        Route::ContainerStop,
        move |request: StopContainerRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.stop(&request.id, request.timeout_seconds).await?;
                Ok(Empty {})
            }
        },
    );

    let svc = containers.clone();
    router.route(
        Route::ContainerStartProcess,
        move |request: StartProcessRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.start_process(&request.id, &request.process_id).await?;
                Ok(Empty {})
            }
        },
    );

    let svc = containers.clone();
    router.route(
        Route::ContainerCreateProcess,
        move |request: CreateProcessRequest, _progress| {
            let svc = svc.clone();
            async move {
                svc.create_process(&request.id, &request.process_id, &request.process)
                    .await?;
                Ok(Empty {})
            }
        },
    );

    let svc = containers.clone();
    router.route(Route::ContainerResize, move |request: ResizeRequest, _progress| {
        let svc = svc.clone();
        async move {
            svc.resize(
                &request.id,
                request.process_id.as_deref(),
                request.columns,
                request.rows,
            )
            .await?;
            Ok(Empty {})
        }
    });

    let svc = containers.clone();
    router.route(Route::ContainerWait, move |request: WaitRequest, _progress| {
        let svc = svc.clone();
        async move {
            let exit_code = svc.wait(&request.id, request.process_id.as_deref()).await?;
            Ok(WaitResponse { exit_code })
        }
    });

    let svc = containers;
    router.route(Route::ContainerKill, move |request: KillRequest, _progress| {
        let svc = svc.clone();
        async move {
            svc.kill(&request.id, &request.signal).await?;
            Ok(Empty {})
        }
    });
}
