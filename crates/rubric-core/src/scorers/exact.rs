use crate::scorer::Score;
use crate::scorers::rouge::rouge_l_f1;

/// Exact or variant match, with ROUGE-L overlap as the graded score.
///
/// `passed` comes from whole-string comparison after trimming; the overlap
/// score never influences it.
pub fn score(candidate: &str, expected: &str, acceptable_variations: &[String]) -> Score {
	let candidate = candidate.trim();
	let expected = expected.trim();

	let passed = candidate == expected
		|| acceptable_variations.iter().any(|v| candidate == v.trim());

	Score::new(rouge_l_f1(expected, candidate), passed)
}
