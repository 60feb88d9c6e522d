//! Artifact store: a content-addressed, optionally-indexed on-disk store
//! for large payloads (spec §3, §4.8). Computes a stable identifier,
//! chooses a human-readable filename, writes with restrictive
//! permissions, generates a preview, and hands back a reference object
//! the caller substitutes into the result stream.
//!
//! Grounded on the teacher's `sha2`-based content hashing in
//! `agent::tools::obsidian::cache::content_hash` and filename
//! sanitization in `safe_vault_name`, generalized from "vault name" to
//! "tool + primary-identifier" per §4.8's filename grammar. The canonical
//! JSON encoding used for hashing reuses the key-sorting idiom from
//! `agent::tools::registry::canonical_json`.


mod filename;
mod preview;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::ArtifactConfig;

pub use filename::derive_filename;

/// A persisted payload reference (spec §3 `ArtifactItem`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactItem {
    pub id: String,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
    pub mime: String,
    pub tool: String,
    pub args_digest: String,
    pub created_at: DateTime<Utc>,
    pub preview: Value,
}

/// The substitute value returned in place of a large result (spec §3
/// `ArtifactReference`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReference {
    pub artifact_id: String,
    pub artifact_uri: String,
    pub artifact_path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
    pub mime: String,
    pub preview: Value,
}

impl ArtifactItem {
    fn to_reference(&self) -> ArtifactReference {
        ArtifactReference {
            artifact_id: self.id.clone(),
            artifact_uri: format!("artifact://{}", self.id),
            artifact_path: self.path.clone(),
            sha256: self.sha256.clone(),
            bytes: self.bytes,
            mime: self.mime.clone(),
            preview: self.preview.clone(),
        }
    }
}

/// Either the original value (unchanged, below the inline ceiling) or an
/// externalized artifact reference, wrapped as JSON for direct
/// substitution into `ExecutedStep.result`.
pub enum MaybeExternalized {
    Inline(Value),
    Externalized(ArtifactReference),
}

impl MaybeExternalized {
    pub fn into_value(self) -> Value {
        match self {
            Self::Inline(value) => value,
            Self::Externalized(reference) => serde_json::to_value(reference).unwrap_or(Value::Null),
        }
    }
}

pub struct ArtifactStore {
    config: ArtifactConfig,
    index: Mutex<HashMap<String, ArtifactItem>>,
    insertion_order: Mutex<Vec<String>>,
}

impl ArtifactStore {
    pub fn new(config: ArtifactConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir)
            .with_context(|| format!("failed to create artifact directory {:?}", config.dir))?;
        Ok(Self {
            config,
            index: Mutex::new(HashMap::new()),
            insertion_order: Mutex::new(Vec::new()),
        })
    }

    /// `MaybeStore`: externalize `value` only if it exceeds
    /// `inline_max_bytes` (spec §4.8).
    pub fn maybe_store(&self, tool: &str, args: &Value, value: &Value) -> Result<MaybeExternalized> {
        let canonical = canonical_json_bytes(value);
        if canonical.len() <= self.config.inline_max_bytes {
            return Ok(MaybeExternalized::Inline(value.clone()));
        }

        let pretty = serde_json::to_vec_pretty(value).unwrap_or(canonical);
        let item = self.persist(tool, args, &pretty, "application/json")?;
        Ok(MaybeExternalized::Externalized(item.to_reference()))
    }

    /// `StoreBytes`: always persists, regardless of size.
    pub fn store_bytes(
        &self,
        tool: &str,
        args: &Value,
        mime: &str,
        bytes: &[u8],
    ) -> Result<ArtifactReference> {
        let item = self.persist(tool, args, bytes, mime)?;
        Ok(item.to_reference())
    }

    fn persist(&self, tool: &str, args: &Value, bytes: &[u8], mime: &str) -> Result<ArtifactItem> {
        let sha256 = hex::encode(Sha256::digest(bytes));
        let id = sha256.clone();
        let args_digest = {
            let canonical_args = canonical_json_bytes(args);
            hex::encode(Sha256::digest(&canonical_args))[..16].to_string()
        };

        let created_at = chrono::Utc::now();
        let ext = extension_for_mime(mime);
        let filename = filename::derive_filename(tool, args, &sha256, created_at, ext);
        let path = self.config.dir.join(filename);

        write_with_restrictive_permissions(&path, bytes)
            .with_context(|| format!("failed to write artifact at {path:?}"))?;

        let preview = preview::derive_preview(bytes, mime, self.config.preview_bytes);

        let item = ArtifactItem {
            id,
            path,
            sha256,
            bytes: bytes.len() as u64,
            mime: mime.to_string(),
            tool: tool.to_string(),
            args_digest,
            created_at,
            preview,
        };

        if self.config.keep_index {
            let mut index = self.index.lock().unwrap();
            let mut order = self.insertion_order.lock().unwrap();
            if !index.contains_key(&item.id) {
                order.push(item.id.clone());
            }
            index.insert(item.id.clone(), item.clone());
        }

        Ok(item)
    }

    /// `List`: items in insertion order (empty if `keep_index=false`).
    pub fn list(&self) -> Vec<ArtifactItem> {
        let index = self.index.lock().unwrap();
        let order = self.insertion_order.lock().unwrap();
        order.iter().filter_map(|id| index.get(id).cloned()).collect()
    }

    /// `Get`: looks the item up by id, `None` if not indexed.
    pub fn get(&self, id: &str) -> Option<ArtifactItem> {
        self.index.lock().unwrap().get(id).cloned()
    }

    /// `Read`: bytes and mime for an indexed artifact.
    pub fn read(&self, id: &str) -> Result<Option<(Vec<u8>, String)>> {
        let Some(item) = self.get(id) else {
            return Ok(None);
        };
        let bytes = std::fs::read(&item.path)
            .with_context(|| format!("failed to read artifact file at {:?}", item.path))?;
        Ok(Some((bytes, item.mime)))
    }
}

fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(&canonical_value(value)).unwrap_or_default()
}

fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonical_value(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "application/json" => "json",
        "text/plain" => "txt",
        "text/markdown" => "md",
        _ if mime.starts_with("text/") => "txt",
        _ => "bin",
    }
}

#[cfg(unix)]
fn write_with_restrictive_permissions(path: &std::path::Path, bytes: &[u8]) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, bytes)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn write_with_restrictive_permissions(path: &std::path::Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)?;
    Ok(())
}
