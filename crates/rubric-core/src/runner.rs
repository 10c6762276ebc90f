use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use rubric_types::{BatchReport, CategorizedResult, FailureStage, TestDefinition, TrialResult};
use tracing::{info, info_span, warn, Instrument};

use crate::aggregate::summarize;
use crate::datasource::DataSource;
use crate::error::EvalError;
use crate::evaluator::Evaluator;
use crate::generation::{GenerationBackend, GenerationRequest};
use crate::spec::EvaluationSpec;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct TrialRunnerBuilder {
	data_source: Option<Arc<dyn DataSource>>,
	backend: Option<Arc<dyn GenerationBackend>>,
	evaluator: Evaluator,
	model: String,
	concurrency: usize,
	timeout: Duration,
}

impl TrialRunnerBuilder {
	pub fn new() -> Self {
		Self {
			data_source: None,
			backend: None,
			evaluator: Evaluator::new(),
			model: String::new(),
			concurrency: DEFAULT_CONCURRENCY,
			timeout: DEFAULT_TIMEOUT,
		}
	}

	pub fn data_source(mut self, data_source: Arc<dyn DataSource>) -> Self {
		self.data_source = Some(data_source);
		self
	}

	pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
		self.backend = Some(backend);
		self
	}

	pub fn evaluator(mut self, evaluator: Evaluator) -> Self {
		self.evaluator = evaluator;
		self
	}

	pub fn model(mut self, model: impl Into<String>) -> Self {
		self.model = model.into();
		self
	}

	pub fn concurrency(mut self, n: usize) -> Self {
		self.concurrency = n.max(1);
		self
	}

	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn build(self) -> Result<TrialRunner> {
		Ok(TrialRunner {
			data_source: self.data_source,
			backend: self.backend.ok_or_else(|| anyhow::anyhow!("backend must be set"))?,
			evaluator: self.evaluator,
			model: self.model,
			concurrency: self.concurrency,
			timeout: self.timeout,
		})
	}
}

impl Default for TrialRunnerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Runs trials: generate, then score. A failure in any stage is recorded on
/// that trial and never aborts the batch.
pub struct TrialRunner {
	data_source: Option<Arc<dyn DataSource>>,
	backend: Arc<dyn GenerationBackend>,
	evaluator: Evaluator,
	model: String,
	concurrency: usize,
	timeout: Duration,
}

impl TrialRunner {
	pub fn builder() -> TrialRunnerBuilder {
		TrialRunnerBuilder::new()
	}

	pub fn model(&self) -> &str {
		&self.model
	}

	/// Load definitions from the configured data source and run them all.
	pub async fn run(&self) -> Result<BatchReport> {
		let data_source = self
			.data_source
			.as_ref()
			.ok_or_else(|| anyhow::anyhow!("data_source must be set to call run()"))?;
		let definitions = data_source.load().await?;
		Ok(self.run_batch(definitions).await)
	}

	pub async fn run_batch(&self, definitions: Vec<TestDefinition>) -> BatchReport {
		let started_at = Utc::now();
		let total = definitions.len();

		let mut results: Vec<CategorizedResult> = stream::iter(definitions)
			.map(|def| async move {
				let result = self.run_trial(&def).await;
				CategorizedResult::new(def.category_or_default(), result)
			})
			.buffer_unordered(self.concurrency)
			.collect()
			.await;
		results.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.result.id.cmp(&b.result.id)));

		let summary = summarize(&results);
		info!(
			model = %self.model,
			total,
			passed = summary.overall.passed_count,
			mean_score = summary.overall.mean_score,
			"batch finished"
		);

		BatchReport {
			model: self.model.clone(),
			started_at,
			results,
			summary,
		}
	}

	pub async fn run_trial(&self, def: &TestDefinition) -> TrialResult {
		let span = info_span!("trial", id = %def.test_id, kind = %def.evaluation.kind);
		self.run_trial_inner(def).instrument(span).await
	}

	async fn run_trial_inner(&self, def: &TestDefinition) -> TrialResult {
		let expected_text = def.evaluation.expected_text();

		if let Some(reason) = &def.load_error {
			let err = EvalError::InvalidSpecification(reason.clone());
			warn!(error = %err, "skipping unreadable definition");
			return TrialResult::aborted(&def.test_id, expected_text, FailureStage::Specification, err.to_string());
		}

		let spec = match EvaluationSpec::try_from(&def.evaluation) {
			Ok(spec) => spec,
			Err(err) => {
				warn!(error = %err, "rejecting trial");
				return TrialResult::aborted(&def.test_id, expected_text, FailureStage::Specification, err.to_string());
			}
		};

		let request = GenerationRequest::from_test_case(&self.model, &def.test_case);
		let started = Instant::now();
		let outcome = tokio::time::timeout(self.timeout, self.backend.generate(&request)).await;
		let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

		let generation = match outcome {
			Ok(Ok(generation)) => generation,
			Ok(Err(err)) => {
				let err = EvalError::Generation(format!("{err:#}"));
				warn!(error = %err, latency_ms, "generation failed");
				return TrialResult::aborted(&def.test_id, expected_text, FailureStage::Generation, err.to_string())
					.with_latency(latency_ms);
			}
			Err(_) => {
				let err = EvalError::Generation(format!("timed out after {:?}", self.timeout));
				warn!(error = %err, "generation timed out");
				return TrialResult::aborted(&def.test_id, expected_text, FailureStage::Generation, err.to_string())
					.with_latency(latency_ms);
			}
		};

		match self.evaluator.evaluate(&generation.text, &spec).await {
			Ok(score) => TrialResult::scored(&def.test_id, generation.text, expected_text, score.value, score.passed)
				.with_latency(latency_ms)
				.with_usage(generation.prompt_tokens, generation.completion_tokens),
			Err(err) => {
				warn!(error = %err, "evaluation failed");
				TrialResult::aborted(&def.test_id, expected_text, FailureStage::Evaluation, err.to_string())
					.with_candidate(generation.text)
					.with_latency(latency_ms)
					.with_usage(generation.prompt_tokens, generation.completion_tokens)
			}
		}
	}
}
