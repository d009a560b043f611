//! Network service: NAT networks persisted under `<app_root>/networks/`
//! and the hosts table the embedded DNS server answers from.

mod domain;
mod error;
mod service;

pub use domain::validate_domain_name;
pub use error::NetworkError;
pub use service::{HostsTable, NetworkService, DEFAULT_NETWORK_ID};
