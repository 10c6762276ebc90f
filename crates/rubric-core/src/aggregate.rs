//! Folding trial results into per-category and overall summaries.

use std::collections::BTreeMap;

use rubric_types::{BatchSummary, CategorizedResult, Summary, TrialResult};

/// Running totals for one summary key.
#[derive(Debug, Default)]
struct Tally {
	tests_run: usize,
	passed: usize,
	scores: Vec<f64>,
	latencies: Vec<f64>,
}

impl Tally {
	fn add(&mut self, result: &TrialResult) {
		self.tests_run += 1;
		if result.passed {
			self.passed += 1;
		}
		// Non-finite scores are undefined and stay out of the mean.
		if result.score.is_finite() {
			self.scores.push(result.score);
		}
		if let Some(latency) = result.latency_ms {
			self.latencies.push(latency);
		}
	}

	fn finish(self) -> Summary {
		let scored = self.scores.len();
		let mean_score = if scored == 0 { 0.0 } else { ordered_sum(self.scores) / scored as f64 };
		let pass_rate = if self.tests_run == 0 {
			0.0
		} else {
			self.passed as f64 / self.tests_run as f64
		};
		Summary {
			tests_run: self.tests_run,
			passed_count: self.passed,
			failed_count: self.tests_run - self.passed,
			mean_score,
			pass_rate,
			total_latency_ms: ordered_sum(self.latencies),
		}
	}
}

/// Float addition is not associative; summing in sorted order makes the
/// result independent of arrival order.
fn ordered_sum(mut values: Vec<f64>) -> f64 {
	values.sort_by(f64::total_cmp);
	values.into_iter().sum()
}

/// Summarize a batch. Categories never mix: each mean covers only the trials
/// filed under that key. Empty input yields an empty category map and a zero
/// overall summary.
pub fn summarize(results: &[CategorizedResult]) -> BatchSummary {
	let mut overall = Tally::default();
	let mut categories: BTreeMap<String, Tally> = BTreeMap::new();

	for entry in results {
		overall.add(&entry.result);
		categories.entry(entry.category.clone()).or_default().add(&entry.result);
	}

	BatchSummary {
		categories: categories.into_iter().map(|(k, t)| (k, t.finish())).collect(),
		overall: overall.finish(),
	}
}
