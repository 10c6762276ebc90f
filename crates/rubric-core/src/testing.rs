use anyhow::Result;
use rubric_types::BatchReport;

/// Helper to assert the overall pass rate meets a threshold.
///
/// Use this in your `#[tokio::test]` functions.
///
/// # Example
/// ```ignore
/// #[tokio::test]
/// async fn test_my_model() -> Result<()> {
///     let runner = TrialRunner::builder()
///         .data_source(data)
///         .backend(backend)
///         .build()?;
///
///     let report = runner.run().await?;
///
///     // Assert 80% pass rate
///     assert_pass_rate(&report, 0.8)?;
///
///     Ok(())
/// }
/// ```
pub fn assert_pass_rate(report: &BatchReport, min_pass_rate: f64) -> Result<()> {
	let overall = &report.summary.overall;
	if overall.pass_rate < min_pass_rate {
		anyhow::bail!(
			"Benchmark failed: pass rate {:.1}% is below threshold {:.1}%\n{}",
			overall.pass_rate * 100.0,
			min_pass_rate * 100.0,
			report.summary_table()
		);
	}
	Ok(())
}

/// Helper to assert the overall mean score meets a threshold.
///
/// This is where a cutoff for semantic similarity belongs; the strategy
/// itself always passes.
pub fn assert_mean_score(report: &BatchReport, min_mean_score: f64) -> Result<()> {
	let overall = &report.summary.overall;
	if overall.mean_score < min_mean_score {
		anyhow::bail!(
			"Benchmark failed: mean score {:.3} is below threshold {:.3}\n{}",
			overall.mean_score,
			min_mean_score,
			report.summary_table()
		);
	}
	Ok(())
}

/// Helper to assert every trial passed.
pub fn assert_all_passed(report: &BatchReport) -> Result<()> {
	let overall = &report.summary.overall;
	if overall.passed_count != overall.tests_run {
		anyhow::bail!(
			"Benchmark failed: {}/{} trials passed\n{}",
			overall.passed_count,
			overall.tests_run,
			report.summary_table()
		);
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::aggregate::summarize;
	use chrono::Utc;
	use rubric_types::{CategorizedResult, TrialResult};

	fn report(results: Vec<CategorizedResult>) -> BatchReport {
		BatchReport {
			model: "m".to_string(),
			started_at: Utc::now(),
			summary: summarize(&results),
			results,
		}
	}

	#[test]
	fn test_thresholds() {
		let report = report(vec![
			CategorizedResult::new("a", TrialResult::scored("1", "x", "x", 1.0, true)),
			CategorizedResult::new("a", TrialResult::scored("2", "y", "x", 0.5, false)),
		]);
		assert!(assert_pass_rate(&report, 0.5).is_ok());
		assert!(assert_pass_rate(&report, 0.6).is_err());
		assert!(assert_mean_score(&report, 0.75).is_ok());
		assert!(assert_mean_score(&report, 0.8).is_err());

		let err = assert_all_passed(&report).unwrap_err();
		assert!(err.to_string().contains("1/2 trials passed"));
	}
}
