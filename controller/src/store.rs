use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use serde_json::{Map, Value};

use tempcontrol_common::LogRecord;

const LOG_FILE: &str = "logs.json";
const DEFAULT_TABLE: &str = "_default";

/// Append-only record log stored as a TinyDB document:
/// `{"_default": {"1": {...}, "2": {...}}}`.
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn insert(&self, record: &LogRecord) -> anyhow::Result<u64> {
        let mut document = self.load().await?;

        let table = document
            .entry(DEFAULT_TABLE)
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(table) = table else {
            bail!("{} table in {} is not an object", DEFAULT_TABLE, self.path.display());
        };

        let id = table
            .keys()
            .filter_map(|key| key.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        table.insert(id.to_string(), serde_json::to_value(record)?);

        self.save(&document).await?;
        Ok(id)
    }

    async fn load(&self) -> anyhow::Result<Map<String, Value>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        serde_json::from_slice(&raw)
            .with_context(|| format!("{} is not a JSON object", self.path.display()))
    }

    async fn save(&self, document: &Map<String, Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let payload = serde_json::to_vec(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn records(&self) -> anyhow::Result<Vec<(u64, LogRecord)>> {
        let document = self.load().await?;
        let Some(Value::Object(table)) = document.get(DEFAULT_TABLE) else {
            return Ok(Vec::new());
        };
        let mut records = table
            .iter()
            .map(|(id, value)| -> anyhow::Result<(u64, LogRecord)> {
                Ok((id.parse()?, serde_json::from_value(value.clone())?))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        records.sort_by_key(|(id, _)| *id);
        Ok(records)
    }
}
