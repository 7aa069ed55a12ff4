use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde::Deserialize;
use serde::Serialize;

use crate::Document;
use crate::DocumentSet;
use crate::TranscludeError;
use crate::TranscludeResult;
use crate::engine::Engine;
use crate::engine::ExpandOptions;
use crate::metadata;
use crate::metadata::DEFAULT_METADATA_KEY;
use crate::metadata::FrontmatterOutput;
use crate::resolver::ExactResolver;
use crate::resolver::FallbackResolver;
use crate::resolver::FileSystemResolver;
use crate::resolver::FolderResolver;
use crate::resolver::ResolverChain;

/// Default pattern selecting the documents the stage processes.
pub const DEFAULT_PATTERN: &str = "**/*.md";

/// What the stage does when a document fails to expand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
	/// Stop at the first failing document and write nothing back.
	#[default]
	FailFast,
	/// Leave failing documents untouched, record their errors and keep going.
	Collect,
}

/// Configuration of a [`TranscludeStage`].
///
/// ```toml
/// [transclude]
/// pattern = "**/*.md"
/// permalink = true
/// comments = false
/// frontmatter = true
/// frontmatter_output = "both"
/// fallback = false
/// error_policy = "collect"
/// skip_missing = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct StageOptions {
	/// Glob selecting eligible document keys. Also limits which documents a
	/// folder reference collects.
	pub pattern: String,
	/// Rewrite extensionless targets to `<target>.md` or `<target>/index.md`
	/// before expansion.
	pub permalink: bool,
	/// Precede every substitution with a comment naming its source key.
	pub comments: bool,
	/// Split fragment front matter off before substitution and merge it into
	/// the parent's metadata tree.
	pub frontmatter: bool,
	/// Add the target, resolver and calling document to comment markers.
	pub verbose: bool,
	/// Substitute the literal target text for references nothing resolves,
	/// instead of failing.
	pub fallback: bool,
	/// Behaviour when a document fails.
	pub error_policy: ErrorPolicy,
	/// Leave documents whose sources are missing on disk untouched instead of
	/// failing.
	pub skip_missing: bool,
	/// Metadata field that receives the transclusion tree.
	pub metadata_key: String,
	/// Where the transclusion tree is written.
	pub frontmatter_output: FrontmatterOutput,
	/// Resolve targets the document set lacks from this directory.
	pub source_root: Option<PathBuf>,
}

impl Default for StageOptions {
	fn default() -> Self {
		Self {
			pattern: DEFAULT_PATTERN.to_string(),
			permalink: false,
			comments: false,
			frontmatter: false,
			verbose: false,
			fallback: false,
			error_policy: ErrorPolicy::default(),
			skip_missing: false,
			metadata_key: DEFAULT_METADATA_KEY.to_string(),
			frontmatter_output: FrontmatterOutput::default(),
			source_root: None,
		}
	}
}

impl StageOptions {
	pub fn expand_options(&self) -> ExpandOptions {
		ExpandOptions {
			comments: self.comments,
			verbose: self.verbose,
			permalink: self.permalink,
		}
	}
}

/// A document the stage left untouched because a source was missing.
#[derive(Debug)]
pub struct SkippedDocument {
	pub key: String,
	pub reason: TranscludeError,
}

/// A document left untouched under [`ErrorPolicy::Collect`] because its
/// expansion failed. `key` is the document the stage was expanding; the error
/// may name a nested fragment.
#[derive(Debug)]
pub struct FailedDocument {
	pub key: String,
	pub error: TranscludeError,
}

/// Outcome of one stage run.
#[derive(Debug, Default)]
pub struct StageReport {
	/// Eligible documents whose content or metadata changed.
	pub transcluded: Vec<String>,
	/// Eligible documents that needed no change.
	pub unchanged: Vec<String>,
	/// Documents skipped because a source file was missing.
	pub skipped: Vec<SkippedDocument>,
	/// Documents that failed under [`ErrorPolicy::Collect`].
	pub failures: Vec<FailedDocument>,
}

impl StageReport {
	pub fn is_ok(&self) -> bool {
		self.failures.is_empty()
	}

	/// Turn the report into the first recorded failure, if any.
	pub fn into_result(mut self) -> TranscludeResult<Self> {
		if self.failures.is_empty() {
			Ok(self)
		} else {
			Err(self.failures.remove(0).error)
		}
	}
}

/// The pluggable pipeline stage: expands every eligible document of a set.
#[derive(Debug)]
pub struct TranscludeStage {
	options: StageOptions,
	matcher: GlobSet,
	resolvers: ResolverChain,
}

impl TranscludeStage {
	/// Create a stage with the built-in resolver chain for `options`.
	pub fn new(options: StageOptions) -> TranscludeResult<Self> {
		let matcher = build_glob_set(&options.pattern)?;
		let resolvers = default_resolvers(&options, &matcher);

		Ok(Self {
			options,
			matcher,
			resolvers,
		})
	}

	/// Create a stage that resolves through a caller-supplied chain.
	pub fn with_resolvers(options: StageOptions, resolvers: ResolverChain) -> TranscludeResult<Self> {
		let matcher = build_glob_set(&options.pattern)?;

		Ok(Self {
			options,
			matcher,
			resolvers,
		})
	}

	pub fn options(&self) -> &StageOptions {
		&self.options
	}

	pub fn resolvers(&self) -> &ResolverChain {
		&self.resolvers
	}

	pub fn resolvers_mut(&mut self) -> &mut ResolverChain {
		&mut self.resolvers
	}

	/// Whether the document at `key` is processed by this stage.
	pub fn is_eligible(&self, key: &str) -> bool {
		self.matcher.is_match(key)
	}

	/// Expand every eligible document of `documents`.
	///
	/// Documents are visited in key order and every expansion reads the set as
	/// it was before the run. Results are staged and written back only once
	/// all documents were processed; under [`ErrorPolicy::FailFast`] nothing is
	/// written when any document fails.
	#[tracing::instrument(level = "debug", skip_all, fields(documents = documents.len()))]
	pub fn run(&self, documents: &mut DocumentSet) -> TranscludeResult<StageReport> {
		let mut report = StageReport::default();
		let mut staged: Vec<(String, Document)> = Vec::new();

		{
			let engine = Engine::new(documents, &self.resolvers, self.options.expand_options());

			for (key, document) in documents.iter() {
				if !self.is_eligible(key) {
					tracing::trace!(document = %key, "skip");
					continue;
				}

				match self.process(&engine, key, document) {
					Ok(Some(updated)) => {
						report.transcluded.push(key.clone());
						staged.push((key.clone(), updated));
					}
					Ok(None) => report.unchanged.push(key.clone()),
					Err(error) if error.is_missing_source() && self.options.skip_missing => {
						tracing::warn!(document = %key, %error, "skipping document with missing source");
						report.skipped.push(SkippedDocument {
							key: key.clone(),
							reason: error,
						});
					}
					Err(error) => {
						match self.options.error_policy {
							ErrorPolicy::FailFast => return Err(error),
							ErrorPolicy::Collect => {
								tracing::warn!(document = %key, %error, "transclusion failed");
								report.failures.push(FailedDocument {
									key: key.clone(),
									error,
								});
							}
						}
					}
				}
			}
		}

		for (key, document) in staged {
			documents.insert(key, document);
		}

		tracing::debug!(
			transcluded = report.transcluded.len(),
			unchanged = report.unchanged.len(),
			skipped = report.skipped.len(),
			failed = report.failures.len(),
			"transcluded"
		);

		Ok(report)
	}

	/// Expand a single document and apply the metadata merge policy. Returns
	/// `None` when nothing changed.
	fn process(
		&self,
		engine: &Engine<'_>,
		key: &str,
		document: &Document,
	) -> TranscludeResult<Option<Document>> {
		let expansion = engine.expand(key, &document.content)?;

		if expansion.tree.is_empty() && !expansion.changed(&document.content) {
			return Ok(None);
		}

		let mut updated = Document::with_metadata(expansion.content, document.metadata.clone());

		if self.options.frontmatter && !expansion.tree.is_empty() {
			let output = self.options.frontmatter_output;
			if output.writes_metadata() {
				metadata::attach(
					&mut updated.metadata,
					&self.options.metadata_key,
					&expansion.tree,
					key,
				)?;
			}
			if output.writes_content() {
				updated.content = metadata::attach_to_content(
					&updated.content,
					&self.options.metadata_key,
					&expansion.tree,
					key,
				)?;
			}
		}

		Ok(Some(updated))
	}
}

/// The built-in resolver chain for `options`: exact, folder, then the
/// optional filesystem and fallback resolvers.
pub fn default_resolvers(options: &StageOptions, filter: &GlobSet) -> ResolverChain {
	let mut chain = ResolverChain::new()
		.with(ExactResolver {
			extract_frontmatter: options.frontmatter,
		})
		.with(FolderResolver {
			extract_frontmatter: options.frontmatter,
			filter: Some(filter.clone()),
		});

	if let Some(root) = &options.source_root {
		chain.push(FileSystemResolver {
			root: root.clone(),
			extract_frontmatter: options.frontmatter,
			missing_is_error: !options.fallback,
		});
	}

	if options.fallback {
		chain.push(FallbackResolver);
	}

	chain
}

/// Check whether `key` matches the glob `pattern`.
pub fn matches(key: &str, pattern: &str) -> TranscludeResult<bool> {
	Ok(build_glob_set(pattern)?.is_match(key))
}

fn build_glob_set(pattern: &str) -> TranscludeResult<GlobSet> {
	let invalid = |reason: String| {
		TranscludeError::InvalidPattern {
			pattern: pattern.to_string(),
			reason,
		}
	};

	let glob = Glob::new(pattern).map_err(|e| invalid(e.to_string()))?;
	GlobSetBuilder::new()
		.add(glob)
		.build()
		.map_err(|e| invalid(e.to_string()))
}
