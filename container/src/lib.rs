//! Container service: turns create requests into validated
//! configurations through the assembly pipeline, persists container
//! records, and drives the external VM runtime through the
//! [`runtime::Runtime`] seam.

mod error;
mod pipeline;
mod runtime;
mod service;

pub use error::ContainerError;
pub use pipeline::ConfigurationPipeline;
pub use runtime::{HelperRuntime, Runtime, RUNTIME_PLUGIN};
pub use service::{ContainerRecord, ContainerService};
