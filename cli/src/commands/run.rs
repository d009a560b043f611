use crate::commands::print_progress;
use crate::flags::RunArgs;
use berth_core::api::{ContainerIdRequest, CreateContainerResponse, Empty, WaitRequest, WaitResponse};
use berth_core::{ApiClient, Route};

/// Creates a container; with `start` it also boots it and waits for the
/// process, propagating the guest exit code.
pub async fn run(
    client: &ApiClient,
    args: RunArgs,
    start: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = args.into_request()?;

    let created: CreateContainerResponse = client
        .call_with_progress(Route::ContainerCreate, &request, print_progress)
        .await
        .map_err(|e| format!("create: {e}"))?;
    let id = created.id;

    if !start {
        println!("{id}");
        return Ok(());
    }

    let _: Empty = client
        .call(Route::ContainerBootstrap, &ContainerIdRequest { id: id.clone() })
        .await
        .map_err(|e| format!("bootstrap: {e}"))?;

    let response: WaitResponse = client
        .call(
            Route::ContainerWait,
            &WaitRequest {
                id: id.clone(),
                process_id: None,
            },
        )
        .await
        .map_err(|e| format!("wait: {e}"))?;

    if response.exit_code != 0 {
        std::process::exit(response.exit_code as i32);
    }
    Ok(())
}
