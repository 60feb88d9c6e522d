//! Resource facade: exposes `artifact://<id>` as a listable/readable
//! resource backed by the artifact store (spec §4.9). Thin translation
//! layer between the store's native types and the `rmcp` server's
//! resource surface (wired up in `server.rs`).

use crate::artifact::ArtifactStore;
use crate::errors::RouterError;

const URI_PREFIX: &str = "artifact://";

/// One listable resource descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub mime: String,
}

/// Contents of a successfully read resource.
#[derive(Debug, Clone)]
pub struct ResourceContents {
    pub uri: String,
    pub mime: String,
    pub text: String,
}

/// One descriptor per indexed artifact, tool name as display name.
pub fn list_resources(store: &ArtifactStore) -> Vec<ResourceDescriptor> {
    store
        .list()
        .into_iter()
        .map(|item| ResourceDescriptor {
            uri: format!("{URI_PREFIX}{}", item.id),
            name: item.tool,
            mime: item.mime,
        })
        .collect()
}

/// Parse `uri`, look the artifact up, and return its contents as a single
/// text block. Malformed or unresolvable URIs surface `InvalidInput`
/// (mapped to the external `InvalidParams` error at the protocol edge).
pub fn read_resource(store: &ArtifactStore, uri: &str) -> Result<ResourceContents, RouterError> {
    let id = parse_artifact_uri(uri)?;

    let Some((bytes, mime)) = store.read(&id).map_err(RouterError::Internal)? else {
        return Err(RouterError::InvalidInput(format!(
            "no artifact indexed for uri '{uri}'"
        )));
    };

    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok(ResourceContents {
        uri: uri.to_string(),
        mime,
        text,
    })
}

fn parse_artifact_uri(uri: &str) -> Result<String, RouterError> {
    let trimmed = uri.trim_end();
    let Some(id) = trimmed.strip_prefix(URI_PREFIX) else {
        return Err(RouterError::InvalidInput(format!(
            "uri '{uri}' does not use the artifact:// scheme"
        )));
    };
    if id.is_empty() {
        return Err(RouterError::InvalidInput(format!(
            "uri '{uri}' has an empty artifact id"
        )));
    }
    Ok(id.to_string())
}
