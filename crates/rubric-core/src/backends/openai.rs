//! OpenAI-compatible HTTP backends: chat completions for generation and the
//! embeddings endpoint for semantic similarity.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generation::{Generation, GenerationBackend, GenerationRequest};
use crate::similarity::Embedder;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
	pub base_url: String,
	pub api_key: Option<String>,
	/// HTTP-level timeout. The runner applies its own per-trial timeout on top.
	pub timeout: Duration,
}

impl Default for OpenAiConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.to_string(),
			api_key: None,
			timeout: Duration::from_secs(120),
		}
	}
}

#[derive(Debug, Clone)]
struct HttpClient {
	client: Client,
	config: OpenAiConfig,
}

impl HttpClient {
	fn new(config: OpenAiConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(config.timeout)
			.build()
			.context("building HTTP client")?;
		Ok(Self { client, config })
	}

	async fn post<Req, Resp>(&self, endpoint: &str, body: &Req) -> Result<Resp>
	where
		Req: Serialize + ?Sized,
		Resp: for<'de> Deserialize<'de>,
	{
		let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
		let mut req = self.client.post(&url).json(body);
		if let Some(ref api_key) = self.config.api_key {
			req = req.bearer_auth(api_key);
		}

		let resp = req.send().await.with_context(|| format!("POST {url}"))?;
		let status = resp.status();
		if !status.is_success() {
			let body = resp.text().await.unwrap_or_default();
			let message = match serde_json::from_str::<ErrorResponse>(&body) {
				Ok(e) => e.error.message,
				Err(_) if body.trim().is_empty() => "unknown error".to_string(),
				Err(_) => body.trim().to_string(),
			};
			return Err(anyhow!("HTTP {}: {}", status.as_u16(), message));
		}
		resp.json::<Resp>().await.context("decoding response body")
	}
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
	error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
	message: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
	model: &'a str,
	messages: Vec<ChatMessage>,
	temperature: f32,
	max_tokens: u32,
	top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
	role: String,
	#[serde(default)]
	content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
	choices: Vec<ChatChoice>,
	#[serde(default)]
	usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
	message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
	prompt_tokens: u32,
	completion_tokens: u32,
}

/// Chat-completions backend for any OpenAI-compatible server.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
	http: HttpClient,
}

impl OpenAiBackend {
	pub fn new(config: OpenAiConfig) -> Result<Self> {
		debug!(base_url = %config.base_url, "initializing chat backend");
		Ok(Self { http: HttpClient::new(config)? })
	}
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
	async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
		let body = ChatCompletionRequest {
			model: &request.model,
			messages: vec![
				ChatMessage { role: "system".to_string(), content: Some(request.system_prompt.clone()) },
				ChatMessage { role: "user".to_string(), content: Some(request.user_message()) },
			],
			temperature: request.params.temperature,
			max_tokens: request.params.max_tokens,
			top_p: request.params.top_p,
		};

		let resp: ChatCompletionResponse = self.http.post("/chat/completions", &body).await?;
		let choice = resp
			.choices
			.into_iter()
			.next()
			.ok_or_else(|| anyhow!("response contained no choices"))?;
		let usage = resp.usage.unwrap_or(ChatUsage { prompt_tokens: 0, completion_tokens: 0 });

		Ok(Generation {
			text: choice.message.content.unwrap_or_default(),
			prompt_tokens: usage.prompt_tokens,
			completion_tokens: usage.completion_tokens,
		})
	}
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
	model: &'a str,
	input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
	embedding: Vec<f32>,
}

/// Embeddings endpoint client, used through `EmbeddingSimilarity`.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
	http: HttpClient,
	model: String,
}

impl OpenAiEmbeddings {
	pub fn new(config: OpenAiConfig, model: impl Into<String>) -> Result<Self> {
		Ok(Self {
			http: HttpClient::new(config)?,
			model: model.into(),
		})
	}
}

#[async_trait]
impl Embedder for OpenAiEmbeddings {
	async fn embed(&self, text: &str) -> Result<Vec<f32>> {
		let body = EmbeddingRequest { model: &self.model, input: text };
		let resp: EmbeddingResponse = self.http.post("/embeddings", &body).await?;
		resp.data
			.into_iter()
			.next()
			.map(|d| d.embedding)
			.ok_or_else(|| anyhow!("embeddings response contained no data"))
	}
}
