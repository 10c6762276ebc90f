use serde::{Deserialize, Serialize};

/// What a strategy hands back to the dispatcher: a graded score and a verdict.
///
/// The two are independent. `exact_match` may fail with a high overlap score
/// and `semantic_similarity` always passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
	pub value: f64,
	pub passed: bool,
}

impl Score {
	pub fn new(value: f64, passed: bool) -> Self {
		Self { value, passed }
	}

	pub fn binary(passed: bool) -> Self {
		Self {
			value: if passed { 1.0 } else { 0.0 },
			passed,
		}
	}
}
