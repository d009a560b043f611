//! Shared API surface for the berth daemon and its clients.
//!
//! Everything that crosses the daemon's Unix socket lives here: the domain
//! types that describe a container, the route enumeration, the wire
//! envelope, and the framed client/server implementation.

pub mod api;
pub mod approot;
pub mod error;
pub mod progress;
pub mod routes;
pub mod rpc;
pub mod types;

pub use error::{ApiError, ErrorKind, RpcError};
pub use progress::ProgressEvent;
pub use routes::Route;
pub use rpc::{ApiClient, ApiServer, ClientError, ProgressSink, Router};
pub use types::*;
