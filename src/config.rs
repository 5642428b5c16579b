use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Base URL of the managed semantic index service
    pub index_endpoint: String,
    pub index_api_key: String,
    /// Candidates requested from the index per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Instruction sentence prepended to the query before embedding
    #[serde(default = "default_query_instruction")]
    pub query_instruction: String,
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,
}

fn default_top_k() -> usize {
    50
}

fn default_query_instruction() -> String {
    "Represent the emotional or spiritual concern described by the user \
     to retrieve comforting passages:"
        .to_string()
}

fn default_retrieval_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rerank_timeout")]
    pub timeout_secs: u64,
}

fn default_rerank_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub llm_endpoint: String,
    pub llm_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Streaming completions run longer than retrieval calls
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    "deepseek/deepseek-chat-v3.1:free".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    600
}

fn default_llm_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Final passages returned per response
    #[serde(default = "default_final_passages")]
    pub final_passages: usize,
    /// Maximum query length in characters after trimming
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

fn default_final_passages() -> usize {
    3
}

fn default_max_query_chars() -> usize {
    500
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            final_passages: default_final_passages(),
            max_query_chars: default_max_query_chars(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub retrieval: RetrievalConfig,
    pub rerank: RerankConfig,
    pub web_search: WebSearchConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(crate::SolaceError::Io)?;

        let config: AppConfig =
            toml::from_str(&content).map_err(crate::SolaceError::TomlParsing)?;

        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            println!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::SolaceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Get candidate count requested from the index
    pub fn top_k(&self) -> usize {
        self.retrieval.top_k
    }

    /// Check if reranking is enabled
    pub fn rerank_enabled(&self) -> bool {
        self.rerank.enabled
    }

    /// Get number of final passages per response
    pub fn final_passages(&self) -> usize {
        self.pipeline.final_passages
    }

    /// Get maximum accepted query length in characters
    pub fn max_query_chars(&self) -> usize {
        self.pipeline.max_query_chars
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                enable_cors: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            retrieval: RetrievalConfig {
                index_endpoint: "http://localhost:6333".to_string(),
                index_api_key: String::new(),
                top_k: default_top_k(),
                query_instruction: default_query_instruction(),
                timeout_secs: default_retrieval_timeout(),
            },
            rerank: RerankConfig {
                endpoint: "http://localhost:8580".to_string(),
                api_key: String::new(),
                enabled: true,
                timeout_secs: default_rerank_timeout(),
            },
            web_search: WebSearchConfig {
                endpoint: "https://api.search.example/search".to_string(),
                api_key: String::new(),
                timeout_secs: default_retrieval_timeout(),
            },
            llm: LlmConfig {
                llm_endpoint: "https://openrouter.ai/api/v1".to_string(),
                llm_key: String::new(),
                llm_model: default_llm_model(),
                temperature: default_temperature(),
                max_tokens: default_max_tokens(),
                timeout_secs: default_llm_timeout(),
            },
            pipeline: PipelineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_sane() {
        let config = AppConfig::default();
        assert_eq!(config.top_k(), 50);
        assert_eq!(config.final_passages(), 3);
        assert_eq!(config.max_query_chars(), 500);
        assert!(config.rerank_enabled());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 9090

            [logging]
            level = "debug"
            backtrace = false

            [retrieval]
            index_endpoint = "http://index:6333"
            index_api_key = "k"

            [rerank]
            endpoint = "http://rerank:8580"
            api_key = "k"

            [web_search]
            endpoint = "http://search:9000"
            api_key = "k"

            [llm]
            llm_endpoint = "http://llm:11434"
            llm_key = "k"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.top_k(), 50);
        assert_eq!(config.llm.timeout_secs, 120);
        assert!(config.server.enable_cors);
    }
}
