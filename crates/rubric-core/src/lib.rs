//! rubric-core: score language-model output against declared expectations
//! and roll the verdicts up into per-category summaries.
//! Compose a data source, a generation backend and an evaluator; run with concurrency.
//! See `examples/simple.rs` for a quickstart.

pub mod aggregate;
pub mod config;
pub mod datasource;
pub mod error;
pub mod evaluator;
pub mod generation;
pub mod report;
pub mod runner;
pub mod scorer;
pub mod similarity;
pub mod spec;
pub mod testing;

pub mod backends {
	pub mod openai;
}

pub mod scorers {
	pub mod exact;
	pub mod regex;
	pub mod rouge;
	pub mod semantic;
}

pub use aggregate::summarize;
pub use backends::openai::{OpenAiBackend, OpenAiConfig, OpenAiEmbeddings};
pub use config::BenchConfig;
pub use datasource::{DataSource, DirectoryDataSource, FileDataSource, JsonlDataSource, VecDataSource};
pub use error::EvalError;
pub use evaluator::Evaluator;
pub use generation::{from_async_fn, Generation, GenerationBackend, GenerationRequest};
pub use report::generate_html_report;
pub use runner::{TrialRunner, TrialRunnerBuilder};
pub use scorer::Score;
pub use similarity::{embedder_fn, EmbeddingSimilarity, Embedder, SimilarityBackend};
pub use spec::{EvaluationKind, EvaluationSpec};
pub use rubric_types::{
	BatchReport, BatchSummary, CategorizedResult, Evaluation, FailureStage, SamplingParams, Summary, TestCase,
	TestDefinition, TrialResult,
};
