use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rubric_types::{SamplingParams, TestCase};

/// Everything a backend needs to produce one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
	pub model: String,
	pub system_prompt: String,
	pub user_prompt: String,
	pub context: Option<String>,
	pub params: SamplingParams,
}

impl GenerationRequest {
	pub fn from_test_case(model: impl Into<String>, case: &TestCase) -> Self {
		Self {
			model: model.into(),
			system_prompt: case.system_prompt.clone(),
			user_prompt: case.user_prompt.clone(),
			context: case.context.clone(),
			params: case.parameters,
		}
	}

	/// User message as sent to the model: the context, when present, precedes
	/// the prompt.
	pub fn user_message(&self) -> String {
		match self.context.as_deref().map(str::trim) {
			Some(context) if !context.is_empty() => format!("{context}\n\n{}", self.user_prompt),
			_ => self.user_prompt.clone(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
	pub text: String,
	pub prompt_tokens: u32,
	pub completion_tokens: u32,
}

impl Generation {
	pub fn text(text: impl Into<String>) -> Self {
		Self { text: text.into(), ..Self::default() }
	}
}

/// The model under test. Any error is recorded as a generation failure on
/// the trial; the engine never retries.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
	async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}

/// Wrap an async closure as a `GenerationBackend`.
pub fn from_async_fn<F, Fut>(f: F) -> Arc<dyn GenerationBackend>
where
	F: Send + Sync + 'static + Fn(&GenerationRequest) -> Fut,
	Fut: Future<Output = Result<Generation>> + Send + 'static,
{
	struct ClosureBackend<F> {
		f: F,
	}

	#[async_trait]
	impl<F, Fut> GenerationBackend for ClosureBackend<F>
	where
		F: Send + Sync + 'static + Fn(&GenerationRequest) -> Fut,
		Fut: Future<Output = Result<Generation>> + Send + 'static,
	{
		async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
			(self.f)(request).await
		}
	}

	Arc::new(ClosureBackend { f })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_context_precedes_prompt() {
		let mut case = TestCase::new("What is the capital?");
		let req = GenerationRequest::from_test_case("m", &case);
		assert_eq!(req.user_message(), "What is the capital?");

		case.context = Some("The country is France.".to_string());
		let req = GenerationRequest::from_test_case("m", &case);
		assert_eq!(req.user_message(), "The country is France.\n\nWhat is the capital?");
	}

	#[tokio::test]
	async fn test_closure_backend() {
		let backend = from_async_fn(|req| {
			let prompt = req.user_prompt.clone();
			async move { Ok(Generation::text(prompt.to_uppercase())) }
		});
		let out = backend
			.generate(&GenerationRequest::from_test_case("m", &TestCase::new("hi")))
			.await
			.unwrap();
		assert_eq!(out.text, "HI");
	}
}
