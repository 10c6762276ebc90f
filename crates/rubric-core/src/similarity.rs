//! Semantic similarity backends.
//!
//! The engine treats similarity as a black box returning a scalar in [0, 1].
//! [`EmbeddingSimilarity`] is the stock implementation: cosine similarity of
//! two embeddings produced by any [`Embedder`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{EvalError, EvalResult};

#[async_trait]
pub trait SimilarityBackend: Send + Sync {
	async fn similarity(&self, candidate: &str, reference: &str) -> EvalResult<f64>;
}

/// Wrap a synchronous function as a `SimilarityBackend`.
pub fn from_fn<F>(f: F) -> Arc<dyn SimilarityBackend>
where
	F: Fn(&str, &str) -> EvalResult<f64> + Send + Sync + 'static,
{
	struct FnSimilarity<F>(F);

	#[async_trait]
	impl<F> SimilarityBackend for FnSimilarity<F>
	where
		F: Fn(&str, &str) -> EvalResult<f64> + Send + Sync + 'static,
	{
		async fn similarity(&self, candidate: &str, reference: &str) -> EvalResult<f64> {
			(self.0)(candidate, reference)
		}
	}

	Arc::new(FnSimilarity(f))
}

#[async_trait]
pub trait Embedder: Send + Sync {
	async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Wrap an async embedding closure as an `Embedder`.
pub fn embedder_fn<F, Fut>(f: F) -> Arc<dyn Embedder>
where
	F: Fn(&str) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = anyhow::Result<Vec<f32>>> + Send + 'static,
{
	struct FnEmbedder<F>(F);

	#[async_trait]
	impl<F, Fut> Embedder for FnEmbedder<F>
	where
		F: Fn(&str) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<Vec<f32>>> + Send + 'static,
	{
		async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
			(self.0)(text).await
		}
	}

	Arc::new(FnEmbedder(f))
}

pub struct EmbeddingSimilarity {
	embedder: Arc<dyn Embedder>,
}

impl EmbeddingSimilarity {
	pub fn new(embedder: Arc<dyn Embedder>) -> Self {
		Self { embedder }
	}
}

#[async_trait]
impl SimilarityBackend for EmbeddingSimilarity {
	async fn similarity(&self, candidate: &str, reference: &str) -> EvalResult<f64> {
		let c_vec = self
			.embedder
			.embed(candidate)
			.await
			.map_err(|e| EvalError::Similarity(format!("embedding candidate: {e:#}")))?;
		let r_vec = self
			.embedder
			.embed(reference)
			.await
			.map_err(|e| EvalError::Similarity(format!("embedding reference: {e:#}")))?;

		if c_vec.len() != r_vec.len() {
			return Err(EvalError::Similarity(format!(
				"embedding dimensions differ: {} vs {}",
				c_vec.len(),
				r_vec.len()
			)));
		}

		Ok(cosine_similarity(&c_vec, &r_vec).clamp(0.0, 1.0))
	}
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0f64;
	let mut norm_a = 0.0f64;
	let mut norm_b = 0.0f64;

	for (a_val, b_val) in a.iter().zip(b.iter()) {
		let x = *a_val as f64;
		let y = *b_val as f64;

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn bag_of_letters() -> Arc<dyn Embedder> {
		embedder_fn(|text: &str| {
			let mut v = vec![0.0f32; 26];
			for c in text.chars().filter(|c| c.is_ascii_lowercase()) {
				v[(c as u8 - b'a') as usize] += 1.0;
			}
			async move { Ok(v) }
		})
	}

	#[test]
	fn test_cosine_basics() {
		assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
		assert_eq!(cosine_similarity(&[], &[]), 0.0);
	}

	#[tokio::test]
	async fn test_identical_texts_are_fully_similar() {
		let sim = EmbeddingSimilarity::new(bag_of_letters());
		let value = sim.similarity("abc", "abc").await.unwrap();
		assert!((value - 1.0).abs() < 1e-9);
	}

	#[tokio::test]
	async fn test_negative_cosine_is_clamped() {
		let embedder = embedder_fn(|text: &str| {
			let v = if text == "up" { vec![1.0f32, 0.0] } else { vec![-1.0f32, 0.0] };
			async move { Ok(v) }
		});
		let sim = EmbeddingSimilarity::new(embedder);
		assert_eq!(sim.similarity("up", "down").await.unwrap(), 0.0);
	}

	#[tokio::test]
	async fn test_embedder_failure_maps_to_similarity_error() {
		let embedder = embedder_fn(|_: &str| async {
			Err(anyhow::anyhow!("503 from embeddings endpoint"))
		});
		let err = EmbeddingSimilarity::new(embedder).similarity("a", "b").await.unwrap_err();
		assert!(matches!(err, EvalError::Similarity(ref m) if m.contains("503")));
	}
}
