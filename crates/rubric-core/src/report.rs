use rubric_types::{BatchReport, Summary};

/// Render a self-contained HTML page for a finished batch.
pub fn generate_html_report(report: &BatchReport) -> String {
	let mut category_rows = String::new();
	for (name, summary) in &report.summary.categories {
		category_rows.push_str(&format!(
			r#"
            <tr>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td class="{}">{:.1}%</td>
                <td>{:.3}</td>
            </tr>"#,
			html_escape(name),
			summary.tests_run,
			summary.passed_count,
			summary.failed_count,
			rate_class(summary),
			summary.pass_rate * 100.0,
			summary.mean_score,
		));
	}

	let mut detail_rows = String::new();
	for entry in &report.results {
		let r = &entry.result;
		let row_class = if r.passed { "pass" } else { "fail" };
		let icon = if r.passed { "✓" } else { "✗" };
		let output = match (&r.failure_reason, r.failure_stage) {
			(Some(reason), Some(stage)) => format!(
				r#"<span class="badge fail">{:?} failure</span> {}"#,
				stage,
				html_escape(reason)
			),
			(Some(reason), None) => html_escape(reason),
			_ => format!("<pre>{}</pre>", html_escape(&r.candidate_text)),
		};
		let latency = r.latency_ms.map(|l| format!("{l:.0}")).unwrap_or_else(|| "-".to_string());
		let tokens = match (r.prompt_tokens, r.completion_tokens) {
			(Some(p), Some(c)) => format!("{p} / {c}"),
			_ => "-".to_string(),
		};

		detail_rows.push_str(&format!(
			r#"
            <tr class="{}">
                <td>{}</td>
                <td>{}</td>
                <td class="icon">{}</td>
                <td>{:.3}</td>
                <td>{}</td>
                <td><pre>{}</pre></td>
                <td>{}</td>
                <td>{}</td>
            </tr>"#,
			row_class,
			html_escape(&r.id),
			html_escape(&entry.category),
			icon,
			r.score,
			output,
			html_escape(&r.expected_text),
			latency,
			tokens,
		));
	}

	let overall = &report.summary.overall;

	format!(
		r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Rubric Report: {model}</title>
    <style>
        * {{ box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
        }}
        .container {{
            max-width: 1400px;
            margin: 0 auto;
            background: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        .summary {{
            display: flex;
            gap: 20px;
            margin: 20px 0 30px 0;
            padding: 20px;
            background: #f8f9fa;
            border-radius: 6px;
        }}
        .summary-item {{ flex: 1; }}
        .summary-label {{
            font-size: 12px;
            color: #666;
            text-transform: uppercase;
            letter-spacing: 0.5px;
            margin-bottom: 5px;
        }}
        .summary-value {{ font-size: 28px; font-weight: 600; color: #333; }}
        .good {{ color: #28a745; }}
        .warn {{ color: #ffc107; }}
        .bad {{ color: #dc3545; }}
        table {{ width: 100%; border-collapse: collapse; margin-top: 20px; }}
        th {{
            background: #343a40;
            color: white;
            padding: 12px;
            text-align: left;
            font-size: 13px;
            text-transform: uppercase;
        }}
        td {{ padding: 12px; border-bottom: 1px solid #dee2e6; vertical-align: top; }}
        tr.pass {{ background: #f0f9f4; }}
        tr.fail {{ background: #fef3f2; }}
        .icon {{ text-align: center; font-size: 18px; width: 50px; }}
        pre {{
            margin: 0;
            padding: 8px;
            background: #f8f9fa;
            border-radius: 4px;
            font-size: 12px;
            max-height: 150px;
            overflow: auto;
            white-space: pre-wrap;
            word-break: break-word;
        }}
        .badge {{ padding: 4px 8px; border-radius: 4px; font-size: 11px; font-weight: 600; }}
        .badge.fail {{ background: #f8d7da; color: #721c24; }}
        .timestamp {{ color: #6c757d; font-size: 14px; margin-bottom: 20px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Rubric Report</h1>
        <div class="timestamp">Model: {model} • Started: {started}</div>

        <div class="summary">
            <div class="summary-item">
                <div class="summary-label">Tests Run</div>
                <div class="summary-value">{total}</div>
            </div>
            <div class="summary-item">
                <div class="summary-label">Passed</div>
                <div class="summary-value good">{passed}</div>
            </div>
            <div class="summary-item">
                <div class="summary-label">Failed</div>
                <div class="summary-value bad">{failed}</div>
            </div>
            <div class="summary-item">
                <div class="summary-label">Pass Rate</div>
                <div class="summary-value {rate_class}">{pass_rate:.1}%</div>
            </div>
            <div class="summary-item">
                <div class="summary-label">Mean Score</div>
                <div class="summary-value">{mean_score:.3}</div>
            </div>
            <div class="summary-item">
                <div class="summary-label">Generation Time</div>
                <div class="summary-value">{seconds:.2}s</div>
            </div>
        </div>

        <h2>By Category</h2>
        <table>
            <thead>
                <tr><th>Category</th><th>Run</th><th>Passed</th><th>Failed</th><th>Pass Rate</th><th>Mean Score</th></tr>
            </thead>
            <tbody>{category_rows}
            </tbody>
        </table>

        <h2>Trials</h2>
        <table>
            <thead>
                <tr><th>ID</th><th>Category</th><th>Status</th><th>Score</th><th>Output</th><th>Expected</th><th>Latency (ms)</th><th>Tokens (in / out)</th></tr>
            </thead>
            <tbody>{detail_rows}
            </tbody>
        </table>
    </div>
</body>
</html>"#,
		model = html_escape(&report.model),
		started = report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
		total = overall.tests_run,
		passed = overall.passed_count,
		failed = overall.failed_count,
		rate_class = rate_class(overall),
		pass_rate = overall.pass_rate * 100.0,
		mean_score = overall.mean_score,
		seconds = overall.total_latency_ms / 1000.0,
		category_rows = category_rows,
		detail_rows = detail_rows,
	)
}

fn rate_class(summary: &Summary) -> &'static str {
	if summary.pass_rate >= 0.8 {
		"good"
	} else if summary.pass_rate >= 0.5 {
		"warn"
	} else {
		"bad"
	}
}

fn html_escape(s: &str) -> String {
	s.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::aggregate::summarize;
	use chrono::Utc;
	use rubric_types::{CategorizedResult, FailureStage, TrialResult};

	#[test]
	fn test_report_escapes_and_lists_everything() {
		let results = vec![
			CategorizedResult::new("math", TrialResult::scored("m1", "<b>4</b>", "4", 0.0, false)),
			CategorizedResult::new(
				"lang",
				TrialResult::aborted("l1", "bonjour", FailureStage::Generation, "HTTP 429: rate limited"),
			),
		];
		let report = BatchReport {
			model: "gpt-4o-mini".to_string(),
			started_at: Utc::now(),
			summary: summarize(&results),
			results,
		};

		let html = generate_html_report(&report);
		assert!(html.contains("&lt;b&gt;4&lt;/b&gt;"));
		assert!(!html.contains("<b>4</b>"));
		assert!(html.contains("HTTP 429: rate limited"));
		assert!(html.contains("Generation failure"));
		assert!(html.contains("<td>math</td>"));
		assert!(html.contains("<td>lang</td>"));
		assert!(html.contains("Rubric Report: gpt-4o-mini"));
	}
}
