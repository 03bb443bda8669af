//! Host payload input shared by `evaluate` and `check`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use gleaner_types::turn::{SessionState, Turn};

/// One turn plus the session snapshot, as a host would hand them over.
#[derive(Debug, Deserialize)]
pub struct HostPayload {
    pub turn: Turn,
    #[serde(default)]
    pub state: SessionState,
}

impl HostPayload {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("payload must be {\"turn\": {...}, \"state\": {...}}")
    }
}

/// Read a payload from `file`, or from stdin when `None`.
pub async fn read_payload(file: Option<&Path>) -> Result<HostPayload> {
    let raw = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read payload from stdin")?;
            buf
        }
    };
    HostPayload::from_json(&raw)
}
