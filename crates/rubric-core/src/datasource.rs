use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rubric_types::TestDefinition;
use serde_json::Value;
use tracing::{debug, warn};

#[async_trait]
pub trait DataSource: Send + Sync {
	async fn load(&self) -> Result<Vec<TestDefinition>>;
}

pub struct VecDataSource {
	definitions: Vec<TestDefinition>,
}

impl VecDataSource {
	pub fn new(definitions: Vec<TestDefinition>) -> Self {
		Self { definitions }
	}
}

#[async_trait]
impl DataSource for VecDataSource {
	async fn load(&self) -> Result<Vec<TestDefinition>> {
		Ok(self.definitions.clone())
	}
}

/// A single JSON test-definition file. Its category is the name of the
/// directory holding it unless the file declares one.
pub struct FileDataSource {
	path: PathBuf,
}

impl FileDataSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

#[async_trait]
impl DataSource for FileDataSource {
	async fn load(&self) -> Result<Vec<TestDefinition>> {
		let category = self.path.parent().and_then(dir_name);
		Ok(vec![read_definition(&self.path, category).await?])
	}
}

/// Every `*.json` file below `root`, one definition per file, in path order.
///
/// The category of a definition is the first directory under `root` on its
/// path, so `tests/math/algebra/q1.json` files under `math`. Files directly in
/// `root` take the name of `root` itself.
pub struct DirectoryDataSource {
	root: PathBuf,
}

impl DirectoryDataSource {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}
}

#[async_trait]
impl DataSource for DirectoryDataSource {
	async fn load(&self) -> Result<Vec<TestDefinition>> {
		let mut files = Vec::new();
		collect_json_files(&self.root, &mut files).await?;
		files.sort();
		debug!(root = %self.root.display(), files = files.len(), "discovered test definitions");

		let mut definitions = Vec::with_capacity(files.len());
		for file in &files {
			let category = category_for(&self.root, file);
			definitions.push(read_definition(file, category).await?);
		}
		Ok(definitions)
	}
}

/// Read JSONL where each line is a complete test definition.
pub struct JsonlDataSource {
	path: PathBuf,
}

impl JsonlDataSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

#[async_trait]
impl DataSource for JsonlDataSource {
	async fn load(&self) -> Result<Vec<TestDefinition>> {
		let content = tokio::fs::read_to_string(&self.path)
			.await
			.with_context(|| format!("Failed to read {:?}", self.path))?;
		let mut definitions = Vec::new();
		for (idx, line) in content.lines().enumerate() {
			let line = line.trim();
			if line.is_empty() {
				continue;
			}
			let fallback_id = format!("{}:{}", file_label(&self.path), idx + 1);
			definitions.push(parse_definition(line, &fallback_id));
		}
		Ok(definitions)
	}
}

async fn read_definition(path: &Path, category: Option<String>) -> Result<TestDefinition> {
	let content = tokio::fs::read_to_string(path)
		.await
		.with_context(|| format!("Failed to read {:?}", path))?;
	let mut def = parse_definition(&content, &file_label(path));
	if def.category.is_none() {
		def.category = category;
	}
	Ok(def)
}

/// Parse one definition. Malformed input becomes an unreadable placeholder so
/// it fails as its own trial instead of failing the whole load.
fn parse_definition(source: &str, fallback_id: &str) -> TestDefinition {
	match serde_json::from_str::<TestDefinition>(source) {
		Ok(def) => def,
		Err(err) => {
			let test_id = serde_json::from_str::<Value>(source)
				.ok()
				.and_then(|v| v.get("test_id").and_then(Value::as_str).map(str::to_string))
				.unwrap_or_else(|| fallback_id.to_string());
			warn!(test_id = %test_id, error = %err, "unreadable test definition");
			TestDefinition::unreadable(test_id, format!("unreadable test definition {fallback_id}: {err}"))
		}
	}
}

fn file_label(path: &Path) -> String {
	path.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| path.display().to_string())
}

async fn collect_json_files(root: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
	let mut pending = vec![root.to_path_buf()];
	while let Some(dir) = pending.pop() {
		let mut entries = tokio::fs::read_dir(&dir)
			.await
			.with_context(|| format!("Failed to list {:?}", dir))?;
		while let Some(entry) = entries.next_entry().await? {
			let path = entry.path();
			let file_type = entry.file_type().await?;
			if file_type.is_dir() {
				pending.push(path);
			} else if path.extension().is_some_and(|ext| ext == "json") {
				out.push(path);
			}
		}
	}
	if out.is_empty() {
		return Err(anyhow!("no *.json test definitions found under {:?}", root));
	}
	Ok(())
}

fn category_for(root: &Path, file: &Path) -> Option<String> {
	let relative = file.strip_prefix(root).ok()?;
	let mut components = relative.components();
	let first = components.next()?;
	if components.next().is_some() {
		Some(first.as_os_str().to_string_lossy().into_owned())
	} else {
		dir_name(root)
	}
}

fn dir_name(path: &Path) -> Option<String> {
	path.file_name().map(|n| n.to_string_lossy().into_owned())
}
