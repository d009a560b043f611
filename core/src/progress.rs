use serde::{Deserialize, Serialize};

/// One step of a long-running operation, forwarded to the client as it
/// happens. `task` identifies the subtask the update belongs to so that
/// interleaved updates from concurrent stages stay attributable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProgressEvent {
    Update {
        task: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        processed: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },
    /// All subtasks completed or the coordinator was closed.
    Finished,
}
