use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backends::openai::{DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL};

/// Benchmark settings, usually read from a YAML file. Every field can be
/// overridden from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub backend: BackendConfig,
	#[serde(default)]
	pub similarity: Option<SimilarityConfig>,
	#[serde(default)]
	pub data: Option<DataConfig>,
	#[serde(default = "default_concurrency")]
	pub concurrency: usize,
}

fn default_concurrency() -> usize {
	8
}

impl Default for BenchConfig {
	fn default() -> Self {
		Self {
			model: None,
			backend: BackendConfig::default(),
			similarity: None,
			data: None,
			concurrency: default_concurrency(),
		}
	}
}

impl BenchConfig {
	pub fn from_yaml_str(s: &str) -> Result<Self> {
		serde_yaml::from_str(s).context("Invalid benchmark config")
	}

	pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path)
			.await
			.with_context(|| format!("Failed to read {:?}", path))?;
		Self::from_yaml_str(&content).with_context(|| format!("in {:?}", path))
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
	#[serde(default = "default_base_url")]
	pub base_url: String,
	/// Name of the environment variable holding the API key.
	#[serde(default = "default_api_key_env")]
	pub api_key_env: String,
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

fn default_base_url() -> String {
	DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
	"OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
	120
}

impl Default for BackendConfig {
	fn default() -> Self {
		Self {
			base_url: default_base_url(),
			api_key_env: default_api_key_env(),
			timeout_secs: default_timeout_secs(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
	#[serde(default = "default_embedding_model")]
	pub model: String,
	/// Defaults to the generation backend's base URL.
	#[serde(default)]
	pub base_url: Option<String>,
}

fn default_embedding_model() -> String {
	DEFAULT_EMBEDDING_MODEL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
	pub path: PathBuf,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_minimal_config_uses_defaults() {
		let config = BenchConfig::from_yaml_str("model: gpt-4o-mini\n").unwrap();
		assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
		assert_eq!(config.concurrency, 8);
		assert_eq!(config.backend.base_url, DEFAULT_BASE_URL);
		assert_eq!(config.backend.api_key_env, "OPENAI_API_KEY");
		assert_eq!(config.backend.timeout_secs, 120);
		assert!(config.similarity.is_none());
		assert!(config.data.is_none());
	}

	#[test]
	fn test_full_config() {
		let yaml = r#"
model: llama-3.1-8b-instruct
concurrency: 2
backend:
  base_url: http://localhost:8000/v1
  api_key_env: LOCAL_KEY
  timeout_secs: 30
similarity:
  model: bge-small
data:
  path: tests/suite
"#;
		let config = BenchConfig::from_yaml_str(yaml).unwrap();
		assert_eq!(config.concurrency, 2);
		assert_eq!(config.backend.base_url, "http://localhost:8000/v1");
		assert_eq!(config.backend.timeout_secs, 30);
		let similarity = config.similarity.unwrap();
		assert_eq!(similarity.model, "bge-small");
		assert!(similarity.base_url.is_none());
		assert_eq!(config.data.unwrap().path, PathBuf::from("tests/suite"));
	}

	#[test]
	fn test_unknown_yaml_shape_is_rejected() {
		assert!(BenchConfig::from_yaml_str("concurrency: many").is_err());
	}
}
