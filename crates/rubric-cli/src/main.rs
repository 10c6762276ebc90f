use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use rubric_core::{
	generate_html_report, testing, BenchConfig, DataSource, DirectoryDataSource, EmbeddingSimilarity, Evaluator,
	FileDataSource, JsonlDataSource, OpenAiBackend, OpenAiConfig, OpenAiEmbeddings, TrialRunner,
};
use tracing::{info, Level};

mod telemetry;

#[derive(Debug, Parser)]
#[command(name = "rubric", about = "Benchmark an LLM against a suite of test definitions")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	Run(RunArgs),
}

#[derive(Debug, Clone, Parser)]
struct RunArgs {
	/// YAML benchmark config. Flags override its values.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Run a single test-definition JSON file
	#[arg(long, conflicts_with_all = ["category", "data"])]
	test: Option<PathBuf>,

	/// Run every *.json definition below a directory
	#[arg(long, conflicts_with = "data")]
	category: Option<PathBuf>,

	/// JSONL file with one test definition per line
	#[arg(long)]
	data: Option<PathBuf>,

	/// Model name sent to the backend
	#[arg(long)]
	model: Option<String>,

	/// API key for the OpenAI-compatible endpoint. Defaults to the variable
	/// named by `backend.api_key_env` (OPENAI_API_KEY).
	#[arg(long)]
	api_key: Option<String>,

	/// Base URL of the OpenAI-compatible endpoint
	#[arg(long)]
	base_url: Option<String>,

	/// Embedding model used for semantic_similarity; enables the similarity backend
	#[arg(long)]
	embedding_model: Option<String>,

	/// Concurrency (trials in-flight)
	#[arg(long)]
	concurrency: Option<usize>,

	/// Per-trial generation timeout in seconds
	#[arg(long)]
	timeout_secs: Option<u64>,

	/// Write the full report as JSON
	#[arg(long)]
	json_out: Option<PathBuf>,

	/// Write an HTML report
	#[arg(long)]
	html_out: Option<PathBuf>,

	/// Exit non-zero when the overall mean score falls below this value
	#[arg(long)]
	min_score: Option<f64>,

	/// Emit logs as JSON lines
	#[arg(long, action = ArgAction::SetTrue)]
	log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
	dotenvy::dotenv().ok();
	let cli = Cli::parse();
	match cli.command {
		Commands::Run(args) => {
			telemetry::init_tracing(args.log_json, Level::INFO);
			run(args).await?
		}
	}
	Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
	let config = match &args.config {
		Some(path) => BenchConfig::load(path).await?,
		None => BenchConfig::default(),
	};

	let api_key = resolve_api_key(args.api_key.clone(), &config, |name| std::env::var(name).ok())?;
	let Some(model) = args.model.clone().or(config.model.clone()) else {
		bail!("no model: pass --model or set `model` in the config");
	};
	let base_url = args.base_url.clone().unwrap_or(config.backend.base_url.clone());
	let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(config.backend.timeout_secs));
	let concurrency = args.concurrency.unwrap_or(config.concurrency);

	let data = data_source(&args, &config)?;

	let backend = OpenAiBackend::new(OpenAiConfig {
		base_url: base_url.clone(),
		api_key: Some(api_key.clone()),
		timeout,
	})?;

	let mut evaluator = Evaluator::new();
	let embedding = match (&args.embedding_model, &config.similarity) {
		(Some(model), similarity) => Some((
			model.clone(),
			similarity.as_ref().and_then(|s| s.base_url.clone()),
		)),
		(None, Some(similarity)) => Some((similarity.model.clone(), similarity.base_url.clone())),
		(None, None) => None,
	};
	if let Some((embedding_model, embedding_url)) = embedding {
		info!(model = %embedding_model, "semantic similarity enabled");
		let embeddings = OpenAiEmbeddings::new(
			OpenAiConfig {
				base_url: embedding_url.unwrap_or_else(|| base_url.clone()),
				api_key: Some(api_key),
				timeout,
			},
			embedding_model,
		)?;
		evaluator = evaluator.with_similarity(Arc::new(EmbeddingSimilarity::new(Arc::new(embeddings))));
	}

	let runner = TrialRunner::builder()
		.data_source(data)
		.backend(Arc::new(backend))
		.evaluator(evaluator)
		.model(model)
		.concurrency(concurrency)
		.timeout(timeout)
		.build()?;

	let report = runner.run().await?;
	println!("{}", report.summary_table());

	if let Some(path) = args.json_out {
		let json = serde_json::to_string_pretty(&report)?;
		tokio::fs::write(&path, json)
			.await
			.with_context(|| format!("Failed to write {:?}", path))?;
	}
	if let Some(path) = args.html_out {
		tokio::fs::write(&path, generate_html_report(&report))
			.await
			.with_context(|| format!("Failed to write {:?}", path))?;
	}

	if let Some(min_score) = args.min_score {
		testing::assert_mean_score(&report, min_score)?;
	}

	Ok(())
}

fn resolve_api_key(
	flag: Option<String>,
	config: &BenchConfig,
	lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
	let var = &config.backend.api_key_env;
	match flag.or_else(|| lookup(var)).filter(|key| !key.trim().is_empty()) {
		Some(key) => Ok(key),
		None => bail!("no API key: pass --api-key or set {var}"),
	}
}

fn data_source(args: &RunArgs, config: &BenchConfig) -> Result<Arc<dyn DataSource>> {
	if let Some(path) = &args.test {
		return Ok(Arc::new(FileDataSource::new(path)));
	}
	if let Some(path) = &args.category {
		return Ok(Arc::new(DirectoryDataSource::new(path)));
	}
	if let Some(path) = &args.data {
		return Ok(Arc::new(JsonlDataSource::new(path)));
	}
	match &config.data {
		Some(data) if data.path.is_dir() => Ok(Arc::new(DirectoryDataSource::new(&data.path))),
		Some(data) if data.path.extension().is_some_and(|ext| ext == "jsonl") => {
			Ok(Arc::new(JsonlDataSource::new(&data.path)))
		}
		Some(data) => Ok(Arc::new(FileDataSource::new(&data.path))),
		None => bail!("no tests to run: pass --test, --category or --data"),
	}
}
