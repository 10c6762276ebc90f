use std::sync::Arc;

use rubric_types::Evaluation;
use tracing::debug;

use crate::error::{EvalError, EvalResult};
use crate::scorer::Score;
use crate::scorers::{exact, regex, semantic};
use crate::similarity::SimilarityBackend;
use crate::spec::EvaluationSpec;

/// Routes a candidate to the strategy its specification names.
///
/// The result of the strategy is returned untouched: no retries, no fallback
/// strategy, no blending.
#[derive(Clone, Default)]
pub struct Evaluator {
	similarity: Option<Arc<dyn SimilarityBackend>>,
}

impl Evaluator {
	/// An evaluator for exact and regex specs only. Semantic specs fail with
	/// [`EvalError::Similarity`] until a backend is attached.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_similarity(mut self, backend: Arc<dyn SimilarityBackend>) -> Self {
		self.similarity = Some(backend);
		self
	}

	pub async fn evaluate(&self, candidate: &str, spec: &EvaluationSpec) -> EvalResult<Score> {
		debug!(kind = %spec.kind(), "dispatching evaluation");
		match spec {
			EvaluationSpec::ExactMatch { expected, acceptable_variations } => {
				Ok(exact::score(candidate, expected, acceptable_variations))
			}
			EvaluationSpec::RegexMatch { pattern } => Ok(regex::score(candidate, pattern)),
			EvaluationSpec::SemanticSimilarity { expected } => {
				let backend = self.similarity.as_deref().ok_or_else(|| {
					EvalError::Similarity("no similarity backend configured".to_string())
				})?;
				semantic::score(candidate, expected, backend).await
			}
		}
	}

	/// Validate a raw evaluation block and score against it in one step.
	pub async fn evaluate_raw(&self, candidate: &str, raw: &Evaluation) -> EvalResult<Score> {
		let spec = EvaluationSpec::try_from(raw)?;
		self.evaluate(candidate, &spec).await
	}
}

impl std::fmt::Debug for Evaluator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Evaluator")
			.field("similarity", &self.similarity.as_ref().map(|_| "configured"))
			.finish()
	}
}
