use regex::Regex;

use crate::scorer::Score;

/// Search anywhere in the untrimmed candidate. Anchors in the pattern itself
/// still apply. Binary: 1.0 on a match, 0.0 otherwise.
pub fn score(candidate: &str, pattern: &Regex) -> Score {
	Score::binary(pattern.is_match(candidate))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn re(p: &str) -> Regex {
		Regex::new(p).unwrap()
	}

	#[test]
	fn test_regex_match() {
		let score = score("The capital of France is Paris", &re(r"capital.*Paris"));
		assert!(score.passed);
		assert_eq!(score.value, 1.0);
	}

	#[test]
	fn test_regex_no_match() {
		let score = score("The capital of France is Paris", &re(r"capital.*London"));
		assert!(!score.passed);
		assert_eq!(score.value, 0.0);
	}

	#[test]
	fn test_anchored_phone_number() {
		let pattern = re(r"^\d{3}-\d{4}$");
		let score = score("555-1234", &pattern);
		assert!(score.passed);
		assert_eq!(score.value, 1.0);
	}

	#[test]
	fn test_search_semantics_inside_longer_text() {
		let score = score("call 555-1234 now", &re(r"\d{3}-\d{4}"));
		assert!(score.passed);
		assert_eq!(score.value, 1.0);
	}

	#[test]
	fn test_pattern_anchors_are_honoured() {
		let score = score("call 555-1234 now", &re(r"^\d{3}-\d{4}$"));
		assert!(!score.passed);
		assert_eq!(score.value, 0.0);
	}

	#[test]
	fn test_candidate_is_not_trimmed() {
		let score = score(" 555-1234", &re(r"^\d{3}-\d{4}$"));
		assert!(!score.passed);
	}
}
