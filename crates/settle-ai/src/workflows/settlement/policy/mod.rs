//! Policy passage retrieval for the generative classifier.

mod index;
mod splitter;

pub use index::{PolicyIndex, ScoredPassage};
pub use splitter::PolicyPassage;

use super::domain::PolicyContext;
use crate::config::PolicyConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Retrieval failures. Everything except `Backend` means the policy corpus
/// itself is unusable and the run should stop.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("policy document {path} could not be read: {source}")]
    PolicyUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("policy document {path} contains no passages")]
    EmptyPolicy { path: String },
    #[error("retrieval backend failed: {0}")]
    Backend(String),
}

/// Anything that can turn a case summary into relevant policy passages.
#[async_trait]
pub trait PolicyRetrieval: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<PolicyContext, RetrievalError>;
}

/// Lexical retriever over the settlement policy markdown. The index is built
/// on first use (or by [`PolicyRetriever::warm_up`]) and shared read-only.
pub struct PolicyRetriever {
    source_path: PathBuf,
    index_path: Option<PathBuf>,
    top_k: usize,
    index: OnceCell<Arc<PolicyIndex>>,
}

impl PolicyRetriever {
    pub const DEFAULT_TOP_K: usize = 2;

    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            index_path: None,
            top_k: Self::DEFAULT_TOP_K,
            index: OnceCell::new(),
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            source_path: config.source_path.clone(),
            index_path: config.index_path.clone(),
            top_k: config.top_k.max(1),
            index: OnceCell::new(),
        }
    }

    /// Persist the built index to `path` and reuse it on later runs.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn is_ready(&self) -> bool {
        self.index.initialized()
    }

    /// Build (or load) the index now. Idempotent; concurrent callers wait on
    /// the same initialization.
    pub async fn warm_up(&self) -> Result<Arc<PolicyIndex>, RetrievalError> {
        self.index
            .get_or_try_init(|| self.load_index())
            .await
            .cloned()
    }

    /// Ranked passages for an arbitrary query, `top_k` at most.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
        let index = self.warm_up().await?;
        Ok(index
            .search(query, top_k)
            .into_iter()
            .map(|hit| hit.passage.render())
            .collect())
    }

    async fn load_index(&self) -> Result<Arc<PolicyIndex>, RetrievalError> {
        let path = self.source_path.display().to_string();
        let source = tokio::fs::read_to_string(&self.source_path)
            .await
            .map_err(|source| RetrievalError::PolicyUnavailable {
                path: path.clone(),
                source,
            })?;

        if let Some(index_path) = &self.index_path {
            if let Some(index) = read_persisted(index_path, &source).await {
                info!(path = %index_path.display(), passages = index.len(), "reusing policy index");
                return Ok(Arc::new(index));
            }
        }

        let index = PolicyIndex::build(&source);
        if index.is_empty() {
            return Err(RetrievalError::EmptyPolicy { path });
        }
        info!(policy = %path, passages = index.len(), "built policy index");

        if let Some(index_path) = &self.index_path {
            write_persisted(index_path, &index).await;
        }

        Ok(Arc::new(index))
    }
}

#[async_trait]
impl PolicyRetrieval for PolicyRetriever {
    async fn retrieve(&self, query: &str) -> Result<PolicyContext, RetrievalError> {
        let passages = self.search(query, self.top_k).await?;
        Ok(PolicyContext::new(passages))
    }
}

async fn read_persisted(path: &Path, source: &str) -> Option<PolicyIndex> {
    let raw = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice::<PolicyIndex>(&raw) {
        Ok(index) if index.matches_source(source) && !index.is_empty() => Some(index),
        Ok(_) => {
            debug!(path = %path.display(), "persisted policy index is stale");
            None
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable policy index");
            None
        }
    }
}

async fn write_persisted(path: &Path, index: &PolicyIndex) {
    let payload = match serde_json::to_vec(index) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "could not serialize policy index");
            return;
        }
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            warn!(path = %parent.display(), error = %err, "could not create index directory");
            return;
        }
    }

    if let Err(err) = tokio::fs::write(path, payload).await {
        warn!(path = %path.display(), error = %err, "could not persist policy index");
    }
}
