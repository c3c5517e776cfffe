use std::sync::Arc;

use crate::config::Config;
use crate::llm::chat::HttpChatModel;
use crate::llm::cross_encoder::CrossEncoder;
use crate::llm::embeddings::HttpEmbedder;
use crate::llm::{ChatModel, Embedder, Reranker};

/// Handles to the external model services.
#[derive(Clone)]
pub struct Services {
    pub embedder: Arc<dyn Embedder>,
    /// None when no rerank endpoint is configured.
    pub reranker: Option<Arc<dyn Reranker>>,
    pub chat: Arc<dyn ChatModel>,
}

/// Shared application state. Immutable; every request builds its own indexes.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub services: Services,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let reranker = CrossEncoder::from_config(http_client.clone(), &config.reranker)
            .map(|r| Arc::new(r) as Arc<dyn Reranker>);

        let services = Services {
            embedder: Arc::new(HttpEmbedder::new(http_client.clone(), config.llm.clone())),
            reranker,
            chat: Arc::new(HttpChatModel::new(http_client, config.llm.clone())),
        };

        Ok(Self::with_services(config, services))
    }

    pub fn with_services(config: Config, services: Services) -> Self {
        Self { config, services }
    }
}
