use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::Document;
use crate::DocumentSet;
use crate::TranscludeConfig;
use crate::TranscludeError;
use crate::TranscludeResult;
use crate::frontmatter;
use crate::metadata::deep_merge;
use crate::path::normalize_path_key;
use crate::resolver::MARKDOWN_SUFFIX;

/// Options controlling how a source directory is read.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
	/// Gitignore-style patterns to leave out.
	pub exclude_patterns: Vec<String>,
	/// Whether to disable `.gitignore` integration.
	pub disable_gitignore: bool,
}

impl LoadOptions {
	pub fn from_config(config: &TranscludeConfig) -> Self {
		Self {
			exclude_patterns: config.exclude.patterns.clone(),
			disable_gitignore: config.disable_gitignore,
		}
	}
}

/// Everything read from a source directory: text files become documents,
/// anything else is carried through untouched.
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
	pub documents: DocumentSet,
	pub assets: BTreeMap<String, Vec<u8>>,
}

/// A loaded project: its config, root and source tree.
#[derive(Debug)]
pub struct ProjectContext {
	pub root: PathBuf,
	pub config: TranscludeConfig,
	pub tree: SourceTree,
}

impl ProjectContext {
	pub fn source_dir(&self) -> PathBuf {
		self.config.source_dir(&self.root)
	}

	pub fn destination_dir(&self) -> PathBuf {
		self.config.destination_dir(&self.root)
	}
}

/// Load the discovered config at `root` and read its source directory.
pub fn load_project(root: &Path) -> TranscludeResult<ProjectContext> {
	let config = TranscludeConfig::load_or_default(root)?;
	let source = config.source_dir(root);
	let tree = load_source_tree(&source, &LoadOptions::from_config(&config))?;

	Ok(ProjectContext {
		root: root.to_path_buf(),
		config,
		tree,
	})
}

/// Read every file below `dir` into a [`SourceTree`] keyed by `/`-separated
/// relative paths. Markdown front matter is split off into metadata.
pub fn load_source_tree(dir: &Path, options: &LoadOptions) -> TranscludeResult<SourceTree> {
	let mut tree = SourceTree::default();

	for file in collect_files(dir, options)? {
		let key = relative_key(dir, &file);
		let bytes = std::fs::read(&file)?;

		match String::from_utf8(bytes) {
			Ok(text) => {
				let document = if key.ends_with(MARKDOWN_SUFFIX) {
					let parsed = frontmatter::parse(&text).map_err(|e| {
						TranscludeError::InvalidFrontmatter {
							document: key.clone(),
							fragment: key.clone(),
							reason: e.to_string(),
						}
					})?;
					Document::with_metadata(parsed.body, parsed.metadata)
				} else {
					Document::new(text)
				};
				tree.documents.insert(key, document);
			}
			Err(error) => {
				tree.assets.insert(key, error.into_bytes());
			}
		}
	}

	tracing::debug!(
		dir = %dir.display(),
		documents = tree.documents.len(),
		assets = tree.assets.len(),
		"loaded source tree"
	);

	Ok(tree)
}

/// Write `tree` below `dir`, re-serializing document metadata as front
/// matter. Returns the number of files written.
pub fn write_source_tree(tree: &SourceTree, dir: &Path, clean: bool) -> TranscludeResult<usize> {
	if clean && dir.is_dir() {
		std::fs::remove_dir_all(dir)?;
	}

	let mut written = 0;

	for (key, document) in tree.documents.iter() {
		let text = render_document(key, document)?;
		write_file(&dir.join(key), text.as_bytes())?;
		written += 1;
	}

	for (key, bytes) in &tree.assets {
		write_file(&dir.join(key), bytes)?;
		written += 1;
	}

	Ok(written)
}

/// The on-disk text of a document: metadata serialized as front matter,
/// combined with any front matter block already present in the content.
pub fn render_document(key: &str, document: &Document) -> TranscludeResult<String> {
	if document.metadata.is_empty() {
		return Ok(document.content.clone());
	}

	let invalid = |reason: String| {
		TranscludeError::InvalidFrontmatter {
			document: key.to_string(),
			fragment: key.to_string(),
			reason,
		}
	};

	let parsed = frontmatter::parse(&document.content).map_err(|e| invalid(e.to_string()))?;
	let mut metadata = document.metadata.clone();
	deep_merge(&mut metadata, parsed.metadata);

	frontmatter::serialize(&parsed.body, &metadata).map_err(|e| invalid(e.to_string()))
}

fn write_file(path: &Path, bytes: &[u8]) -> TranscludeResult<()> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, bytes)?;
	Ok(())
}

fn relative_key(root: &Path, file: &Path) -> String {
	normalize_path_key(file.strip_prefix(root).unwrap_or(file))
}

/// Build a `Gitignore` matcher from exclude patterns. These follow
/// `.gitignore` syntax and are applied on top of any `.gitignore` rules.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> TranscludeResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			TranscludeError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| TranscludeError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

/// Build a `Gitignore` matcher from the directory's `.gitignore` file (if
/// any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Collect every file below `root`, sorted for deterministic ordering.
fn collect_files(root: &Path, options: &LoadOptions) -> TranscludeResult<Vec<PathBuf>> {
	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();

	let gitignore = if options.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let custom_exclude = build_exclude_matcher(root, &options.exclude_patterns)?;

	walk_dir(
		root,
		&mut files,
		&gitignore,
		&custom_exclude,
		&mut visited_dirs,
	)?;
	files.sort();
	Ok(files)
}

fn walk_dir(
	dir: &Path,
	files: &mut Vec<PathBuf>,
	gitignore: &Gitignore,
	custom_exclude: &Gitignore,
	visited_dirs: &mut HashSet<PathBuf>,
) -> TranscludeResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	// Symlinked directories pointing back up the tree are walked once.
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		tracing::warn!(dir = %dir.display(), "skipping already visited directory");
		return Ok(());
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();

		if path
			.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(|name| name.starts_with('.'))
		{
			continue;
		}

		let is_dir = path.is_dir();
		if gitignore.matched(&path, is_dir).is_ignore()
			|| custom_exclude.matched(&path, is_dir).is_ignore()
		{
			continue;
		}

		if is_dir {
			walk_dir(&path, files, gitignore, custom_exclude, visited_dirs)?;
		} else {
			files.push(path);
		}
	}

	Ok(())
}
