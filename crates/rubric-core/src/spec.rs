//! Validated evaluation specifications.
//!
//! A raw [`Evaluation`] block is checked exactly once, here. Every invariant a
//! strategy relies on (pattern present and compilable, string reference for
//! semantic scoring) holds for any [`EvaluationSpec`] value.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use rubric_types::Evaluation;
use serde_json::Value;

use crate::error::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationKind {
	ExactMatch,
	RegexMatch,
	SemanticSimilarity,
}

impl EvaluationKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			EvaluationKind::ExactMatch => "exact_match",
			EvaluationKind::RegexMatch => "regex_match",
			EvaluationKind::SemanticSimilarity => "semantic_similarity",
		}
	}
}

impl fmt::Display for EvaluationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EvaluationKind {
	type Err = EvalError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"exact_match" => Ok(EvaluationKind::ExactMatch),
			"regex_match" => Ok(EvaluationKind::RegexMatch),
			// "bert_score" is the name older definition files use.
			"semantic_similarity" | "bert_score" => Ok(EvaluationKind::SemanticSimilarity),
			other => Err(EvalError::UnsupportedEvaluationKind(other.to_string())),
		}
	}
}

#[derive(Debug, Clone)]
pub enum EvaluationSpec {
	ExactMatch {
		expected: String,
		acceptable_variations: Vec<String>,
	},
	RegexMatch {
		pattern: Regex,
	},
	SemanticSimilarity {
		expected: String,
	},
}

impl EvaluationSpec {
	pub fn exact_match(expected: impl Into<String>) -> Self {
		EvaluationSpec::ExactMatch {
			expected: expected.into(),
			acceptable_variations: Vec::new(),
		}
	}

	pub fn exact_match_with_variations<I, S>(expected: impl Into<String>, variations: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		EvaluationSpec::ExactMatch {
			expected: expected.into(),
			acceptable_variations: variations.into_iter().map(Into::into).collect(),
		}
	}

	/// Compiles `pattern`. An empty or malformed pattern is rejected here,
	/// never at scoring time.
	pub fn regex_match(pattern: &str) -> Result<Self, EvalError> {
		if pattern.is_empty() {
			return Err(EvalError::InvalidSpecification(
				"regex_match requires a non-empty pattern".to_string(),
			));
		}
		let pattern = Regex::new(pattern).map_err(|e| {
			EvalError::InvalidSpecification(format!("regex_match pattern does not compile: {e}"))
		})?;
		Ok(EvaluationSpec::RegexMatch { pattern })
	}

	pub fn semantic_similarity(expected: impl Into<String>) -> Self {
		EvaluationSpec::SemanticSimilarity { expected: expected.into() }
	}

	pub fn kind(&self) -> EvaluationKind {
		match self {
			EvaluationSpec::ExactMatch { .. } => EvaluationKind::ExactMatch,
			EvaluationSpec::RegexMatch { .. } => EvaluationKind::RegexMatch,
			EvaluationSpec::SemanticSimilarity { .. } => EvaluationKind::SemanticSimilarity,
		}
	}

	/// Reference text echoed into trial results.
	pub fn expected_text(&self) -> &str {
		match self {
			EvaluationSpec::ExactMatch { expected, .. } => expected,
			EvaluationSpec::RegexMatch { .. } => "",
			EvaluationSpec::SemanticSimilarity { expected } => expected,
		}
	}
}

impl TryFrom<&Evaluation> for EvaluationSpec {
	type Error = EvalError;

	fn try_from(raw: &Evaluation) -> Result<Self, Self::Error> {
		if raw.kind.trim().is_empty() {
			return Err(EvalError::InvalidSpecification("evaluation block has no type".to_string()));
		}
		match raw.kind.parse::<EvaluationKind>()? {
			EvaluationKind::ExactMatch => {
				let expected = match &raw.expected_answer {
					None | Some(Value::Null) => {
						return Err(EvalError::InvalidSpecification(
							"exact_match requires expected_answer".to_string(),
						))
					}
					Some(_) => raw.expected_text(),
				};
				Ok(EvaluationSpec::ExactMatch {
					expected,
					acceptable_variations: variations(raw.acceptable_variations.as_ref())?,
				})
			}
			EvaluationKind::RegexMatch => match &raw.regex_pattern {
				None | Some(Value::Null) => EvaluationSpec::regex_match(""),
				Some(Value::String(pattern)) => EvaluationSpec::regex_match(pattern),
				Some(other) => Err(EvalError::InvalidSpecification(format!(
					"regex_pattern must be a string, got {}",
					describe(Some(other))
				))),
			},
			EvaluationKind::SemanticSimilarity => match &raw.expected_answer {
				Some(Value::String(expected)) => Ok(EvaluationSpec::semantic_similarity(expected.clone())),
				other => Err(EvalError::InvalidSpecification(format!(
					"semantic_similarity requires a string expected_answer, got {}",
					describe(other.as_ref())
				))),
			},
		}
	}
}

impl TryFrom<Evaluation> for EvaluationSpec {
	type Error = EvalError;

	fn try_from(raw: Evaluation) -> Result<Self, Self::Error> {
		EvaluationSpec::try_from(&raw)
	}
}

fn variations(value: Option<&Value>) -> Result<Vec<String>, EvalError> {
	let items = match value {
		None | Some(Value::Null) => return Ok(Vec::new()),
		Some(Value::Array(items)) => items,
		Some(other) => {
			return Err(EvalError::InvalidSpecification(format!(
				"acceptable_variations must be an array of strings, got {}",
				describe(Some(other))
			)))
		}
	};
	items
		.iter()
		.map(|item| match item {
			Value::String(s) => Ok(s.clone()),
			other => Err(EvalError::InvalidSpecification(format!(
				"acceptable_variations entries must be strings, got {}",
				describe(Some(other))
			))),
		})
		.collect()
}

fn describe(value: Option<&Value>) -> &'static str {
	match value {
		None | Some(Value::Null) => "nothing",
		Some(Value::Bool(_)) => "a boolean",
		Some(Value::Number(_)) => "a number",
		Some(Value::String(_)) => "a string",
		Some(Value::Array(_)) => "an array",
		Some(Value::Object(_)) => "an object",
	}
}
