use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Maximum accepted upload size in MB
    pub max_upload_mb: usize,
    /// LLM provider configuration (chat + embeddings)
    pub llm: LlmConfig,
    /// Cross-encoder reranker configuration
    pub reranker: RerankerConfig,
    /// Retrieval and fusion parameters
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for query expansion and answers
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Sampling temperature for the paraphrase call
    pub expansion_temperature: f32,
    /// Sampling temperature for the grounded answer call
    pub answer_temperature: f32,
}

/// Configuration for the cross-encoder reranker (Cohere, llama-server, TEI, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Base URL for the reranker API (e.g. "https://api.cohere.com").
    /// If None, the ensemble score is used as the relevance score.
    pub base_url: Option<String>,
    /// Model name to send in the rerank request.
    pub model: Option<String>,
    /// Bearer token for hosted rerankers.
    pub api_key: Option<String>,
    /// Request timeout in seconds (capped at 30).
    pub timeout_secs: u64,
    /// Apply a sigmoid to the returned scores. Needed for servers that return
    /// raw logits instead of 0-1 relevance.
    pub normalize_logits: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Hits kept by each retrieval pass (lexical, semantic, ensemble, rerank).
    pub per_query_k: usize,
    /// Candidates kept after fusing all expanded queries.
    pub fused_top_n: usize,
    /// Ensemble weight of the BM25 list.
    pub lexical_weight: f32,
    /// Ensemble weight of the vector list.
    pub semantic_weight: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            max_upload_mb: 25,
            llm: LlmConfig::default(),
            reranker: RerankerConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            expansion_temperature: 0.075,
            answer_temperature: 0.05,
        }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            api_key: None,
            timeout_secs: 10,
            normalize_logits: false,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            per_query_k: 8,
            fused_top_n: 5,
            lexical_weight: 0.5,
            semantic_weight: 0.5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("PDF_QA_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(val) = std::env::var("PDF_QA_MAX_UPLOAD_MB") {
            if let Ok(v) = val.parse() {
                config.max_upload_mb = v;
            }
        }

        // LLM config
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("LLM_EXPANSION_TEMPERATURE") {
            if let Ok(v) = val.parse() {
                config.llm.expansion_temperature = v;
            }
        }
        if let Ok(val) = std::env::var("LLM_ANSWER_TEMPERATURE") {
            if let Ok(v) = val.parse() {
                config.llm.answer_temperature = v;
            }
        }

        // Reranker config
        if let Ok(url) = std::env::var("RERANKER_BASE_URL") {
            config.reranker.base_url = Some(url);
        }
        if let Ok(model) = std::env::var("RERANKER_MODEL") {
            config.reranker.model = Some(model);
        }
        if let Ok(key) = std::env::var("RERANKER_API_KEY") {
            config.reranker.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("RERANKER_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.reranker.timeout_secs = v.min(30); // Cap at 30s
            }
        }
        if let Ok(val) = std::env::var("RERANKER_NORMALIZE_LOGITS") {
            if let Ok(v) = val.parse() {
                config.reranker.normalize_logits = v;
            }
        }

        // Retrieval config
        if let Ok(val) = std::env::var("RETRIEVAL_PER_QUERY_K") {
            if let Ok(v) = val.parse() {
                config.retrieval.per_query_k = v;
            }
        }
        if let Ok(val) = std::env::var("RETRIEVAL_FUSED_TOP_N") {
            if let Ok(v) = val.parse() {
                config.retrieval.fused_top_n = v;
            }
        }
        if let Ok(val) = std::env::var("RETRIEVAL_LEXICAL_WEIGHT") {
            if let Ok(v) = val.parse() {
                config.retrieval.lexical_weight = v;
            }
        }
        if let Ok(val) = std::env::var("RETRIEVAL_SEMANTIC_WEIGHT") {
            if let Ok(v) = val.parse() {
                config.retrieval.semantic_weight = v;
            }
        }

        config
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}
