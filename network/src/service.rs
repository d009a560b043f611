use crate::error::NetworkError;
use berth_core::api::{NetworkMode, NetworkState, NetworkStatus};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

pub const DEFAULT_NETWORK_ID: &str = "default";

const NETWORKS_DIR: &str = "networks";

/// Hostname to address mappings for attached containers, shared between
/// the network service and the DNS resolver. Lookups are case-insensitive
/// and ignore a trailing dot; insertion keeps the given spelling.
#[derive(Clone, Default)]
pub struct HostsTable {
    entries: Arc<std::sync::RwLock<HashMap<String, Vec<IpAddr>>>>,
}

impl HostsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, hostname: &str, addresses: Vec<IpAddr>) {
        self.entries
            .write()
            .expect("hosts table poisoned")
            .insert(hostname.to_string(), addresses);
    }

    pub fn remove(&self, hostname: &str) {
        self.entries
            .write()
            .expect("hosts table poisoned")
            .remove(hostname);
    }

    pub fn lookup(&self, name: &str) -> Option<Vec<IpAddr>> {
        let name = name.strip_suffix('.').unwrap_or(name);
        let entries = self.entries.read().expect("hosts table poisoned");
        entries
            .iter()
            .find(|(hostname, _)| {
                let stored = hostname.strip_suffix('.').unwrap_or(hostname);
                stored.eq_ignore_ascii_case(name)
            })
            .map(|(_, addresses)| addresses.clone())
    }
}

/// Manages NAT networks persisted as JSON under `<app_root>/networks/`.
pub struct NetworkService {
    root: PathBuf,
    networks: RwLock<HashMap<String, NetworkStatus>>,
    hosts: HostsTable,
    // Next host number per network; address leases live only as long as
    // the daemon.
    next_host: RwLock<HashMap<String, u32>>,
}

impl NetworkService {
    pub async fn new(app_root: &Path) -> Result<Self, NetworkError> {
        let root = app_root.join(NETWORKS_DIR);
        fs::create_dir_all(&root).await?;

        let mut networks = HashMap::new();
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read(&path).await?;
            match serde_json::from_slice::<NetworkStatus>(&contents) {
                Ok(status) => {
                    networks.insert(status.id.clone(), status);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable network state");
                }
            }
        }

        Ok(Self {
            root,
            networks: RwLock::new(networks),
            hosts: HostsTable::new(),
            next_host: RwLock::new(HashMap::new()),
        })
    }

    pub fn hosts(&self) -> HostsTable {
        self.hosts.clone()
    }

    pub async fn create(
        &self,
        id: &str,
        mode: NetworkMode,
    ) -> Result<NetworkStatus, NetworkError> {
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(NetworkError::InvalidArgument(format!(
                "invalid network id: {id}"
            )));
        }

        let mut networks = self.networks.write().await;
        if networks.contains_key(id) {
            return Err(NetworkError::AlreadyExists(id.to_string()));
        }

        let status = NetworkStatus {
            id: id.to_string(),
            mode,
            state: NetworkState::Running,
            subnet: next_subnet(networks.len()),
        };
        self.persist(&status).await?;
        networks.insert(id.to_string(), status.clone());
        tracing::info!(network = id, subnet = %status.subnet, "created network");
        Ok(status)
    }

    pub async fn delete(&self, id: &str) -> Result<(), NetworkError> {
        let mut networks = self.networks.write().await;
        if networks.remove(id).is_none() {
            return Err(NetworkError::NotFound(id.to_string()));
        }
        fs::remove_file(self.state_path(id)).await?;
        tracing::info!(network = id, "deleted network");
        Ok(())
    }

    pub async fn list(&self) -> Vec<NetworkStatus> {
        let networks = self.networks.read().await;
        let mut list: Vec<NetworkStatus> = networks.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub async fn get(&self, id: &str) -> Option<NetworkStatus> {
        self.networks.read().await.get(id).cloned()
    }

    /// Creates the default NAT network when missing. Called once at
    /// daemon bootstrap.
    pub async fn ensure_default(&self) -> Result<NetworkStatus, NetworkError> {
        if let Some(existing) = self.get(DEFAULT_NETWORK_ID).await {
            return Ok(existing);
        }
        self.create(DEFAULT_NETWORK_ID, NetworkMode::Nat).await
    }

    /// Leases the next guest address in a network's subnet. `.1` is the
    /// gateway, so leases start at `.2`.
    pub async fn allocate_address(&self, id: &str) -> Result<IpAddr, NetworkError> {
        let subnet = self
            .get(id)
            .await
            .ok_or_else(|| NetworkError::NotFound(id.to_string()))?
            .subnet;
        let base = subnet
            .split('/')
            .next()
            .and_then(|s| s.parse::<std::net::Ipv4Addr>().ok())
            .ok_or_else(|| {
                NetworkError::InvalidState(format!("network {id} has a malformed subnet"))
            })?;

        let mut counters = self.next_host.write().await;
        let next = counters.entry(id.to_string()).or_insert(2);
        let octets = base.octets();
        let address = std::net::Ipv4Addr::new(octets[0], octets[1], octets[2], *next as u8);
        *next += 1;
        Ok(IpAddr::V4(address))
    }

    fn state_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn persist(&self, status: &NetworkStatus) -> Result<(), NetworkError> {
        let contents = serde_json::to_vec_pretty(status)?;
        fs::write(self.state_path(&status.id), contents).await?;
        Ok(())
    }
}

fn next_subnet(index: usize) -> String {
    format!("192.168.{}.0/24", 64 + index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_default_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let svc = NetworkService::new(dir.path()).await.unwrap();

        let first = svc.ensure_default().await.unwrap();
        let second = svc.ensure_default().await.unwrap();
        assert_eq!(first.id, DEFAULT_NETWORK_ID);
        assert_eq!(first.subnet, second.subnet);
        assert_eq!(svc.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_bad_ids() {
        let dir = TempDir::new().unwrap();
        let svc = NetworkService::new(dir.path()).await.unwrap();

        svc.create("netA", NetworkMode::Nat).await.unwrap();
        assert!(matches!(
            svc.create("netA", NetworkMode::Nat).await,
            Err(NetworkError::AlreadyExists(_))
        ));
        assert!(matches!(
            svc.create("bad name", NetworkMode::Nat).await,
            Err(NetworkError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let dir = TempDir::new().unwrap();
        {
            let svc = NetworkService::new(dir.path()).await.unwrap();
            svc.create("netA", NetworkMode::Nat).await.unwrap();
        }
        let svc = NetworkService::new(dir.path()).await.unwrap();
        let loaded = svc.get("netA").await.unwrap();
        assert_eq!(loaded.state, NetworkState::Running);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let svc = NetworkService::new(dir.path()).await.unwrap();
        assert!(matches!(
            svc.delete("ghost").await,
            Err(NetworkError::NotFound(_))
        ));
    }

    #[test]
    fn test_hosts_lookup_is_case_insensitive_and_dot_tolerant() {
        let hosts = HostsTable::new();
        hosts.insert("c1.example.internal.", vec!["192.168.64.2".parse().unwrap()]);

        assert!(hosts.lookup("C1.Example.Internal").is_some());
        assert!(hosts.lookup("c1.example.internal.").is_some());
        assert!(hosts.lookup("other").is_none());

        hosts.remove("c1.example.internal.");
        assert!(hosts.lookup("c1.example.internal").is_none());
    }
}
