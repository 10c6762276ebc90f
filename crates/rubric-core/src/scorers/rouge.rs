//! Word-level ROUGE-L: F1 over the longest common subsequence of stemmed tokens.

use std::sync::OnceLock;

use rust_stemmers::{Algorithm, Stemmer};

/// Tokens at or below this length are compared unstemmed.
const MIN_STEM_LEN: usize = 3;

fn stemmer() -> &'static Stemmer {
	static STEMMER: OnceLock<Stemmer> = OnceLock::new();
	STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// Lowercases, splits on anything outside `[a-z0-9]` and stems the longer
/// tokens. Non-ASCII letters are separators, so text without ASCII words has
/// no tokens.
pub fn tokenize(text: &str) -> Vec<String> {
	let lowered = text.to_lowercase();
	lowered
		.split(|c: char| !c.is_ascii_alphanumeric())
		.filter(|t| !t.is_empty())
		.map(|t| {
			if t.chars().count() > MIN_STEM_LEN {
				stemmer().stem(t).into_owned()
			} else {
				t.to_string()
			}
		})
		.collect()
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
	// Single rolling row; b is the inner dimension.
	let mut row = vec![0usize; b.len() + 1];
	for x in a {
		let mut diag = 0usize;
		for (j, y) in b.iter().enumerate() {
			let above = row[j + 1];
			row[j + 1] = if x == y { diag + 1 } else { above.max(row[j]) };
			diag = above;
		}
	}
	row[b.len()]
}

/// ROUGE-L F-measure between `reference` and `candidate`, in [0, 1].
///
/// Inputs are expected to be trimmed already. When either side has no word
/// tokens the score is 0.0, unless the two strings are identical and
/// non-empty, which always scores 1.0.
pub fn rouge_l_f1(reference: &str, candidate: &str) -> f64 {
	let ref_tokens = tokenize(reference);
	let cand_tokens = tokenize(candidate);

	if ref_tokens.is_empty() || cand_tokens.is_empty() {
		return if !reference.is_empty() && reference == candidate { 1.0 } else { 0.0 };
	}

	let lcs = lcs_len(&ref_tokens, &cand_tokens) as f64;
	let precision = lcs / cand_tokens.len() as f64;
	let recall = lcs / ref_tokens.len() as f64;
	if precision + recall == 0.0 {
		return 0.0;
	}
	2.0 * precision * recall / (precision + recall)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn approx(a: f64, b: f64) -> bool {
		(a - b).abs() < 1e-9
	}

	#[test]
	fn test_identical_sentences_score_one() {
		assert!(approx(rouge_l_f1("The quick brown fox", "The quick brown fox"), 1.0));
	}

	#[test]
	fn test_case_and_punctuation_are_ignored() {
		assert!(approx(rouge_l_f1("Paris", "paris"), 1.0));
		assert!(approx(rouge_l_f1("Hello, world!", "hello world"), 1.0));
	}

	#[test]
	fn test_stemming_matches_word_forms() {
		assert!(approx(rouge_l_f1("the cats were running", "the cat was running"), 0.75));
		assert_eq!(tokenize("running runs"), vec!["run", "run"]);
	}

	#[test]
	fn test_partial_overlap() {
		// lcs = 3 ("the", "sat", "mat"); p = 3/5, r = 3/6
		let score = rouge_l_f1("the cat sat on the mat", "the dog sat mat today");
		let p = 3.0 / 5.0;
		let r = 3.0 / 6.0;
		assert!(approx(score, 2.0 * p * r / (p + r)));
	}

	#[test]
	fn test_lcs_respects_order() {
		// "b a" shares only one in-order token with "a b"
		assert!(approx(rouge_l_f1("alpha beta", "beta alpha"), 0.5));
	}

	#[test]
	fn test_empty_sides() {
		assert_eq!(rouge_l_f1("Paris", ""), 0.0);
		assert_eq!(rouge_l_f1("", "Paris"), 0.0);
		assert_eq!(rouge_l_f1("", ""), 0.0);
	}

	#[test]
	fn test_non_ascii_letters_are_separators() {
		assert_eq!(tokenize("Café au lait"), vec!["caf", "au", "lait"]);
		assert_eq!(rouge_l_f1("東京 です", "東京 ですね"), 0.0);
		assert_eq!(rouge_l_f1("東京 です", "東京 です"), 1.0);
	}

	#[test]
	fn test_identical_tokenless_strings() {
		assert_eq!(rouge_l_f1("???", "???"), 1.0);
		assert_eq!(rouge_l_f1("???", "!!!"), 0.0);
	}
}
