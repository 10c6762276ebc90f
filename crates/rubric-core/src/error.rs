use thiserror::Error;

/// Errors raised by the evaluation engine.
///
/// None of these abort a batch: the runner folds each one into the
/// offending trial's `failure_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
	#[error("invalid evaluation specification: {0}")]
	InvalidSpecification(String),

	#[error("unsupported evaluation kind: {0:?}")]
	UnsupportedEvaluationKind(String),

	#[error("generation failed: {0}")]
	Generation(String),

	#[error("similarity backend error: {0}")]
	Similarity(String),
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
