use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::collaborators::TailsFetcherBuilder;
use crate::errors::AgentError;

/// StaticTailsFetcher serves tails files registered under their location
#[derive(Clone, Default)]
pub struct StaticTailsFetcher {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl StaticTailsFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn host(&self, location: String, bytes: Vec<u8>) {
        self.files.write().await.insert(location, bytes);
    }
}

#[async_trait]
impl TailsFetcherBuilder for StaticTailsFetcher {
    async fn fetch(&self, location: String) -> Result<Vec<u8>, AgentError> {
        let files = self.files.read().await;
        files
            .get(&location)
            .cloned()
            .ok_or_else(|| AgentError::TransportError(format!("tails not found: {}", location)))
    }
}

/// FileTailsFetcher reads locations as filesystem paths, a `file://` prefix is accepted
#[derive(Clone, Default)]
pub struct FileTailsFetcher;

impl FileTailsFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TailsFetcherBuilder for FileTailsFetcher {
    async fn fetch(&self, location: String) -> Result<Vec<u8>, AgentError> {
        let path = PathBuf::from(location.trim_start_matches("file://"));
        tokio::fs::read(&path)
            .await
            .map_err(|err| AgentError::TransportError(format!("{}: {}", path.display(), err)))
    }
}
