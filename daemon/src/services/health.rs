use berth_core::api::{Empty, PingResponse};
use berth_core::{Route, Router};

pub fn register_health(router: &mut Router) {
    router.route(Route::Ping, |_request: Empty, _progress| async move {
        Ok(PingResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    });
}
