use thiserror::Error;

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
