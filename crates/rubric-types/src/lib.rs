use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::{Table, Tabled};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
	Easy,
	#[default]
	Medium,
	Hard,
}

/// Descriptive metadata carried by a test definition. Never consulted by scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestMetadata {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub author: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub difficulty: Difficulty,
}

/// Sampling parameters forwarded verbatim to the generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
	#[serde(default)]
	pub temperature: f32,
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
	#[serde(default = "default_top_p")]
	pub top_p: f32,
}

fn default_max_tokens() -> u32 {
	512
}

fn default_top_p() -> f32 {
	1.0
}

impl Default for SamplingParams {
	fn default() -> Self {
		Self {
			temperature: 0.0,
			max_tokens: default_max_tokens(),
			top_p: default_top_p(),
		}
	}
}

/// The prompt half of a test definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
	#[serde(default = "default_system_prompt")]
	pub system_prompt: String,
	pub user_prompt: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub context: Option<String>,
	#[serde(default)]
	pub parameters: SamplingParams,
}

fn default_system_prompt() -> String {
	DEFAULT_SYSTEM_PROMPT.to_string()
}

impl TestCase {
	pub fn new(user_prompt: impl Into<String>) -> Self {
		Self {
			system_prompt: default_system_prompt(),
			user_prompt: user_prompt.into(),
			context: None,
			parameters: SamplingParams::default(),
		}
	}
}

/// Evaluation block exactly as declared in a definition file.
///
/// This is unvalidated input; `rubric-core` turns it into a checked
/// specification before anything is scored. Fields are kept as raw JSON so a
/// badly shaped block still loads and is rejected for its own trial only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evaluation {
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expected_answer: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub acceptable_variations: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub regex_pattern: Option<Value>,
}

impl Evaluation {
	pub fn exact_match(expected: impl Into<String>) -> Self {
		Self {
			kind: "exact_match".to_string(),
			expected_answer: Some(Value::String(expected.into())),
			..Self::default()
		}
	}

	pub fn regex_match(pattern: impl Into<String>) -> Self {
		Self {
			kind: "regex_match".to_string(),
			regex_pattern: Some(Value::String(pattern.into())),
			..Self::default()
		}
	}

	pub fn semantic_similarity(expected: impl Into<String>) -> Self {
		Self {
			kind: "semantic_similarity".to_string(),
			expected_answer: Some(Value::String(expected.into())),
			..Self::default()
		}
	}

	pub fn with_variations<I, S>(mut self, variations: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.acceptable_variations = Some(Value::Array(
			variations.into_iter().map(|v| Value::String(v.into())).collect(),
		));
		self
	}

	/// Reference value rendered as text, empty when none was declared.
	pub fn expected_text(&self) -> String {
		match &self.expected_answer {
			None | Some(Value::Null) => String::new(),
			Some(v) => value_preview(v),
		}
	}
}

/// A complete definition: identifier, prompt configuration and evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
	pub test_id: String,
	#[serde(default = "default_version")]
	pub version: String,
	#[serde(default)]
	pub metadata: TestMetadata,
	pub test_case: TestCase,
	pub evaluation: Evaluation,
	/// Grouping key for summaries. Data sources fill this from the file location
	/// when the definition itself does not declare one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	/// Set by data sources for a file or line that could not be parsed. The
	/// runner reports such a definition as a failed trial without running it.
	#[serde(skip)]
	pub load_error: Option<String>,
}

fn default_version() -> String {
	"1.0".to_string()
}

impl TestDefinition {
	pub fn new(test_id: impl Into<String>, test_case: TestCase, evaluation: Evaluation) -> Self {
		Self {
			test_id: test_id.into(),
			version: default_version(),
			metadata: TestMetadata::default(),
			test_case,
			evaluation,
			category: None,
			load_error: None,
		}
	}

	/// Placeholder for a definition whose source could not be parsed.
	pub fn unreadable(test_id: impl Into<String>, reason: impl Into<String>) -> Self {
		Self {
			load_error: Some(reason.into()),
			..Self::new(test_id, TestCase::new(""), Evaluation::default())
		}
	}

	pub fn in_category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn category_or_default(&self) -> &str {
		self.category.as_deref().unwrap_or(UNCATEGORIZED)
	}
}

pub const UNCATEGORIZED: &str = "uncategorized";

/// Stage of a trial that aborted it before a verdict was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
	Specification,
	Generation,
	Evaluation,
}

/// Outcome of one trial. Built once by the runner and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
	pub id: String,
	pub passed: bool,
	pub score: f64,
	pub candidate_text: String,
	pub expected_text: String,
	/// Set only when the trial aborted; a scored miss leaves this empty.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub failure_reason: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub failure_stage: Option<FailureStage>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub latency_ms: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub prompt_tokens: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub completion_tokens: Option<u32>,
}

impl TrialResult {
	pub fn scored(
		id: impl Into<String>,
		candidate_text: impl Into<String>,
		expected_text: impl Into<String>,
		score: f64,
		passed: bool,
	) -> Self {
		Self {
			id: id.into(),
			passed,
			score,
			candidate_text: candidate_text.into(),
			expected_text: expected_text.into(),
			failure_reason: None,
			failure_stage: None,
			latency_ms: None,
			prompt_tokens: None,
			completion_tokens: None,
		}
	}

	/// A trial that never reached a verdict: `passed=false`, `score=0.0`.
	pub fn aborted(
		id: impl Into<String>,
		expected_text: impl Into<String>,
		stage: FailureStage,
		reason: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			passed: false,
			score: 0.0,
			candidate_text: String::new(),
			expected_text: expected_text.into(),
			failure_reason: Some(reason.into()),
			failure_stage: Some(stage),
			latency_ms: None,
			prompt_tokens: None,
			completion_tokens: None,
		}
	}

	pub fn with_candidate(mut self, candidate_text: impl Into<String>) -> Self {
		self.candidate_text = candidate_text.into();
		self
	}

	pub fn with_latency(mut self, latency_ms: f64) -> Self {
		self.latency_ms = Some(latency_ms);
		self
	}

	pub fn with_usage(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
		self.prompt_tokens = Some(prompt_tokens);
		self.completion_tokens = Some(completion_tokens);
		self
	}

	pub fn is_aborted(&self) -> bool {
		self.failure_reason.is_some()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedResult {
	pub category: String,
	pub result: TrialResult,
}

impl CategorizedResult {
	pub fn new(category: impl Into<String>, result: TrialResult) -> Self {
		Self { category: category.into(), result }
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
	pub tests_run: usize,
	pub passed_count: usize,
	pub failed_count: usize,
	pub mean_score: f64,
	pub pass_rate: f64,
	pub total_latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
	pub categories: BTreeMap<String, Summary>,
	pub overall: Summary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
	pub model: String,
	pub started_at: DateTime<Utc>,
	pub results: Vec<CategorizedResult>,
	pub summary: BatchSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
struct TrialRow {
	id: String,
	category: String,
	passed: String,
	score: String,
	latency_ms: String,
	output: String,
	expected: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tabled)]
struct CategoryRow {
	category: String,
	tests_run: usize,
	passed: usize,
	failed: usize,
	mean_score: String,
}

impl BatchReport {
	pub fn summary_table(&self) -> String {
		let mut results: Vec<&CategorizedResult> = self.results.iter().collect();
		results.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.result.id.cmp(&b.result.id)));

		let rows: Vec<TrialRow> = results.into_iter().map(|cr| {
			let r = &cr.result;
			let output = match &r.failure_reason {
				Some(reason) => format!("error: {reason}"),
				None => r.candidate_text.clone(),
			};
			TrialRow {
				id: r.id.clone(),
				category: cr.category.clone(),
				passed: if r.passed { "✔".to_string() } else { "✖".to_string() },
				score: format!("{:.2}", r.score),
				latency_ms: r.latency_ms.map(|l| format!("{l:.2}")).unwrap_or_else(|| "-".to_string()),
				output: truncate(output, 48),
				expected: truncate(r.expected_text.clone(), 48),
			}
		}).collect();

		let category_rows: Vec<CategoryRow> = self.summary.categories.iter().map(|(name, s)| CategoryRow {
			category: name.clone(),
			tests_run: s.tests_run,
			passed: s.passed_count,
			failed: s.failed_count,
			mean_score: format!("{:.2}", s.mean_score),
		}).collect();

		let overall = &self.summary.overall;
		let summary_text = format!(
			"Model: {}  Total: {}  Passed: {}  Failed: {}  Pass rate: {:.1}%  Mean score: {:.2}  Time: {:.2}s",
			self.model,
			overall.tests_run,
			overall.passed_count,
			overall.failed_count,
			overall.pass_rate * 100.0,
			overall.mean_score,
			overall.total_latency_ms / 1000.0,
		);

		format!("{}\n\n{}\n\n{}\n", Table::new(rows), Table::new(category_rows), summary_text)
	}
}

fn value_preview(v: &Value) -> String {
	match v {
		Value::String(s) => s.clone(),
		_ => v.to_string(),
	}
}

fn truncate(s: String, max_len: usize) -> String {
	if s.chars().count() <= max_len {
		return s;
	}
	let mut truncated = s.chars().take(max_len.saturating_sub(1)).collect::<String>();
	truncated.push('…');
	truncated
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_definition_defaults() {
		let def: TestDefinition = serde_json::from_value(json!({
			"test_id": "capital-001",
			"test_case": { "user_prompt": "Capital of France?" },
			"evaluation": { "type": "exact_match", "expected_answer": "Paris" }
		}))
		.unwrap();

		assert_eq!(def.version, "1.0");
		assert_eq!(def.test_case.system_prompt, DEFAULT_SYSTEM_PROMPT);
		assert_eq!(def.test_case.parameters, SamplingParams::default());
		assert_eq!(def.test_case.parameters.max_tokens, 512);
		assert_eq!(def.metadata.difficulty, Difficulty::Medium);
		assert_eq!(def.category_or_default(), UNCATEGORIZED);
	}

	#[test]
	fn test_badly_shaped_evaluation_still_loads() {
		let def: TestDefinition = serde_json::from_value(json!({
			"test_id": "shape-001",
			"test_case": { "user_prompt": "2 + 2 = ?" },
			"evaluation": { "expected_answer": "4", "acceptable_variations": "four", "regex_pattern": 7 }
		}))
		.unwrap();

		assert_eq!(def.evaluation.kind, "");
		assert_eq!(def.evaluation.acceptable_variations, Some(json!("four")));
		assert_eq!(def.evaluation.regex_pattern, Some(json!(7)));
		assert!(def.load_error.is_none());
	}

	#[test]
	fn test_unreadable_placeholder() {
		let def = TestDefinition::unreadable("bad.json", "expected value at line 1").in_category("math");
		assert_eq!(def.load_error.as_deref(), Some("expected value at line 1"));
		assert_eq!(def.category_or_default(), "math");
	}

	#[test]
	fn test_expected_text_renders_scalars() {
		let mut eval = Evaluation::exact_match("Paris");
		assert_eq!(eval.expected_text(), "Paris");

		eval.expected_answer = Some(json!(42));
		assert_eq!(eval.expected_text(), "42");

		eval.expected_answer = None;
		assert_eq!(eval.expected_text(), "");
	}

	#[test]
	fn test_aborted_result_shape() {
		let r = TrialResult::aborted("t1", "Paris", FailureStage::Generation, "connection refused")
			.with_latency(12.5);
		assert!(!r.passed);
		assert_eq!(r.score, 0.0);
		assert_eq!(r.candidate_text, "");
		assert!(r.is_aborted());
		assert_eq!(r.latency_ms, Some(12.5));
	}

	#[test]
	fn test_summary_table_lists_categories() {
		let report = BatchReport {
			model: "gpt-4o-mini".to_string(),
			started_at: Utc::now(),
			results: vec![CategorizedResult::new(
				"math",
				TrialResult::scored("m1", "4", "4", 1.0, true),
			)],
			summary: BatchSummary {
				categories: BTreeMap::from([(
					"math".to_string(),
					Summary { tests_run: 1, passed_count: 1, mean_score: 1.0, pass_rate: 1.0, ..Summary::default() },
				)]),
				overall: Summary { tests_run: 1, passed_count: 1, mean_score: 1.0, pass_rate: 1.0, ..Summary::default() },
			},
		};

		let table = report.summary_table();
		assert!(table.contains("math"));
		assert!(table.contains("m1"));
		assert!(table.contains("Pass rate: 100.0%"));
	}
}
