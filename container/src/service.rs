use crate::error::ContainerError;
use crate::pipeline::ConfigurationPipeline;
use crate::runtime::{logs_path, Runtime};
use berth_core::api::{ContainerSnapshot, CreateContainerRequest, CreateContainerResponse};
use berth_core::{ContainerConfiguration, ContainerStatus, Kernel, ProgressSink};
use berth_network::NetworkService;
use berth_remote::RegistryClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

const CONTAINERS_DIR: &str = "containers";
const RECORD_FILE: &str = "config.json";

/// What the service persists per container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub configuration: ContainerConfiguration,
    pub kernel: Kernel,
    pub status: ContainerStatus,
    /// Addresses leased at bootstrap, one per attachment.
    #[serde(default)]
    pub addresses: Vec<IpAddr>,
}

/// Owns container records under `<app_root>/containers/` and drives the
/// runtime. Mutations serialise per container id; distinct containers
/// proceed in parallel.
pub struct ContainerService {
    root: PathBuf,
    pipeline: ConfigurationPipeline,
    runtime: Arc<dyn Runtime>,
    networks: Arc<NetworkService>,
    records: RwLock<HashMap<String, ContainerRecord>>,
    entity_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContainerService {
    pub async fn new(
        app_root: &Path,
        pipeline: ConfigurationPipeline,
        runtime: Arc<dyn Runtime>,
        networks: Arc<NetworkService>,
    ) -> Result<Self, ContainerError> {
        let root = app_root.join(CONTAINERS_DIR);
        fs::create_dir_all(&root).await?;

        let mut records = HashMap::new();
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let record_path = entry.path().join(RECORD_FILE);
            if !record_path.exists() {
                continue;
            }
            let contents = fs::read(&record_path).await?;
            match serde_json::from_slice::<ContainerRecord>(&contents) {
                Ok(mut record) => {
                    // Helpers do not survive a daemon restart.
                    if record.status == ContainerStatus::Running {
                        record.status = ContainerStatus::Stopped;
                        record.addresses.clear();
                    }
                    records.insert(record.configuration.id.clone(), record);
                }
                Err(e) => {
                    tracing::warn!(path = %record_path.display(), error = %e, "skipping unreadable container record");
                }
            }
        }

        Ok(Self {
            root,
            pipeline,
            runtime,
            networks,
            records: RwLock::new(records),
            entity_locks: Mutex::new(HashMap::new()),
        })
    }

    fn container_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    async fn entity_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.entity_locks
            .lock()
            .await
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn persist(&self, record: &ContainerRecord) -> Result<(), ContainerError> {
        let dir = self.container_dir(&record.configuration.id);
        fs::create_dir_all(&dir).await?;
        let contents = serde_json::to_vec_pretty(record)?;
        fs::write(dir.join(RECORD_FILE), contents).await?;
        Ok(())
    }

    /// Assembles and persists a new container. Nothing is written until
    /// the whole pipeline has succeeded.
    pub async fn create(
        &self,
        registry: &Arc<RegistryClient>,
        request: &CreateContainerRequest,
        progress: ProgressSink,
    ) -> Result<CreateContainerResponse, ContainerError> {
        let id = match &request.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => short_id(),
        };
        if !valid_container_id(&id) {
            return Err(ContainerError::InvalidArgument(format!(
                "invalid container id: {id}"
            )));
        }

        let lock = self.entity_lock(&id).await;
        let _guard = lock.lock().await;
        if self.records.read().await.contains_key(&id) {
            return Err(ContainerError::AlreadyExists(id));
        }

        let (configuration, kernel) = self
            .pipeline
            .assemble(&id, registry, request, progress)
            .await?;

        let record = ContainerRecord {
            configuration: configuration.clone(),
            kernel: kernel.clone(),
            status: ContainerStatus::Created,
            addresses: Vec::new(),
        };
        self.persist(&record).await?;
        self.records.write().await.insert(id.clone(), record);
        tracing::info!(container = %id, image = %request.image, "created container");

        Ok(CreateContainerResponse {
            id,
            configuration,
            kernel,
        })
    }

    pub async fn list(&self) -> Vec<ContainerSnapshot> {
        let records = self.records.read().await;
        let mut snapshots: Vec<ContainerSnapshot> = records
            .values()
            .map(|record| ContainerSnapshot {
                id: record.configuration.id.clone(),
                image: record.configuration.image.reference.clone(),
                status: record.status,
                networks: record.configuration.networks.clone(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    pub async fn get(&self, id: &str) -> Result<ContainerRecord, ContainerError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))
    }

    /// Boots the created container: launches the runtime helper, then
    /// publishes the container's hostnames to the DNS hosts table.
    pub async fn bootstrap(&self, id: &str) -> Result<(), ContainerError> {
        let lock = self.entity_lock(id).await;
        let _guard = lock.lock().await;

        let mut record = self.get(id).await?;
        if record.status != ContainerStatus::Created {
            return Err(ContainerError::InvalidState(format!(
                "container {id} is {}",
                record.status
            )));
        }

        self.runtime
            .bootstrap(&record.configuration, &record.kernel, &self.container_dir(id))
            .await?;

        let hosts = self.networks.hosts();
        let mut addresses = Vec::new();
        for attachment in &record.configuration.networks {
            let address = self.networks.allocate_address(&attachment.network).await?;
            hosts.insert(&attachment.hostname, vec![address]);
            addresses.push(address);
        }

        record.status = ContainerStatus::Running;
        record.addresses = addresses;
        self.persist(&record).await?;
        self.records.write().await.insert(id.to_string(), record);
        tracing::info!(container = id, "container running");
        Ok(())
    }

    pub async fn stop(&self, id: &str, timeout_seconds: Option<u32>) -> Result<(), ContainerError> {
        let lock = self.entity_lock(id).await;
        let _guard = lock.lock().await;

        let mut record = self.get(id).await?;
        if record.status != ContainerStatus::Running {
            return Err(ContainerError::InvalidState(format!(
                "container {id} is not running"
            )));
        }
        self.runtime.stop(id, timeout_seconds).await?;
        self.retire(&mut record).await?;
        Ok(())
    }

    pub async fn kill(&self, id: &str, signal: &str) -> Result<(), ContainerError> {
        let lock = self.entity_lock(id).await;
        let _guard = lock.lock().await;

        let mut record = self.get(id).await?;
        if record.status != ContainerStatus::Running {
            return Err(ContainerError::InvalidState(format!(
                "container {id} is not running"
            )));
        }
        self.runtime.kill(id, signal).await?;
        self.retire(&mut record).await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str, force: bool) -> Result<(), ContainerError> {
        let lock = self.entity_lock(id).await;
        let _guard = lock.lock().await;

        let mut record = self.get(id).await?;
        if record.status == ContainerStatus::Running {
            if !force {
                return Err(ContainerError::InvalidState(format!(
                    "container {id} is running; stop it or use force"
                )));
            }
            let _ = self.runtime.kill(id, "SIGKILL").await;
            self.retire(&mut record).await?;
        }

        self.records.write().await.remove(id);
        let dir = self.container_dir(id);
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
        }
        tracing::info!(container = id, "deleted container");
        Ok(())
    }

    pub async fn logs(&self, id: &str, tail: Option<usize>) -> Result<Vec<String>, ContainerError> {
        let _ = self.get(id).await?;
        let path = logs_path(&self.container_dir(id));
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
        if let Some(tail) = tail {
            if lines.len() > tail {
                lines.drain(..lines.len() - tail);
            }
        }
        Ok(lines)
    }

    pub async fn wait(&self, id: &str, process_id: Option<&str>) -> Result<i64, ContainerError> {
        self.require_running(id).await?;
        self.runtime.wait(id, process_id).await
    }

    pub async fn resize(
        &self,
        id: &str,
        process_id: Option<&str>,
        columns: u16,
        rows: u16,
    ) -> Result<(), ContainerError> {
        self.require_running(id).await?;
        self.runtime.resize(id, process_id, columns, rows).await
    }

    pub async fn create_process(
        &self,
        id: &str,
        process_id: &str,
        process: &berth_core::ProcessConfiguration,
    ) -> Result<(), ContainerError> {
        self.require_running(id).await?;
        self.runtime.create_process(id, process_id, process).await
    }

    pub async fn start_process(&self, id: &str, process_id: &str) -> Result<(), ContainerError> {
        self.require_running(id).await?;
        self.runtime.start_process(id, process_id).await
    }

    pub async fn dial(&self, id: &str, port: u32) -> Result<PathBuf, ContainerError> {
        self.require_running(id).await?;
        self.runtime.dial(id, port).await
    }

    async fn require_running(&self, id: &str) -> Result<(), ContainerError> {
        let record = self.get(id).await?;
        if record.status != ContainerStatus::Running {
            return Err(ContainerError::InvalidState(format!(
                "container {id} is not running"
            )));
        }
        Ok(())
    }

    /// Marks a container stopped and withdraws its DNS entries.
    async fn retire(&self, record: &mut ContainerRecord) -> Result<(), ContainerError> {
        let hosts = self.networks.hosts();
        for attachment in &record.configuration.networks {
            hosts.remove(&attachment.hostname);
        }
        record.status = ContainerStatus::Stopped;
        record.addresses.clear();
        self.persist(record).await?;
        self.records
            .write()
            .await
            .insert(record.configuration.id.clone(), record.clone());
        Ok(())
    }
}

fn short_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..12].to_string()
}

/// Container ids become hostnames, so they follow DNS label rules.
fn valid_container_id(id: &str) -> bool {
    berth_network::validate_domain_name(id)
}
