use std::fmt;
use std::path::PathBuf;

use globset::GlobSet;

use crate::DocumentSet;
use crate::Metadata;
use crate::TranscludeError;
use crate::TranscludeResult;
use crate::frontmatter;
use crate::metadata::deep_merge;
use crate::parser::is_remote_target;
use crate::path::join_key;

/// Suffix tried after the bare target when looking up a document.
pub const MARKDOWN_SUFFIX: &str = ".md";

/// A directive target seen from the document that contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
	/// The target as written in the directive.
	pub target: &'a str,
	/// The display label of the directive.
	pub label: &'a str,
	/// The optional secondary token of the directive.
	pub secondary: Option<&'a str>,
	/// Key of the document the directive appears in. Relative targets are
	/// resolved against its directory.
	pub source_key: &'a str,
}

impl Reference<'_> {
	pub fn is_remote(&self) -> bool {
		is_remote_target(self.target)
	}

	/// The target joined with the directory of the calling document.
	pub fn joined_key(&self) -> Option<String> {
		join_key(self.source_key, self.target)
	}
}

/// One piece of resolved content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
	/// Key of the document the content came from. `None` marks literal text,
	/// which is substituted as-is and never rescanned.
	pub key: Option<String>,
	/// The text substituted for the directive.
	pub content: String,
	/// Front matter extracted from the fragment, routed to the metadata tree.
	pub metadata: Metadata,
}

impl Fragment {
	pub fn keyed(key: impl Into<String>, content: impl Into<String>, metadata: Metadata) -> Self {
		Self {
			key: Some(key.into()),
			content: content.into(),
			metadata,
		}
	}

	pub fn literal(content: impl Into<String>) -> Self {
		Self {
			key: None,
			content: content.into(),
			metadata: Metadata::new(),
		}
	}
}

/// Successful output of a resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
	/// Name of the resolver that claimed the reference.
	pub resolver: &'static str,
	/// Fragments substituted for the directive, in order.
	pub fragments: Vec<Fragment>,
}

impl Resolution {
	pub fn single(resolver: &'static str, fragment: Fragment) -> Self {
		Self {
			resolver,
			fragments: vec![fragment],
		}
	}
}

/// A strategy for turning a reference into content.
///
/// Returning `Ok(None)` means the resolver does not apply and the next one in
/// the chain is tried. Returning an error aborts the current document.
pub trait Resolver {
	fn name(&self) -> &'static str;

	fn resolve(
		&self,
		reference: &Reference<'_>,
		documents: &DocumentSet,
	) -> TranscludeResult<Option<Resolution>>;
}

/// Build the fragment for a document of the set, optionally splitting its
/// front matter off the content.
pub fn document_fragment(
	reference: &Reference<'_>,
	documents: &DocumentSet,
	key: &str,
	extract_frontmatter: bool,
) -> TranscludeResult<Option<Fragment>> {
	let Some(document) = documents.get(key) else {
		return Ok(None);
	};

	if !extract_frontmatter {
		return raw_fragment(reference, key, &document.content, &document.metadata).map(Some);
	}

	text_fragment(reference, key, &document.content, document.metadata.clone()).map(Some)
}

/// The fragment as it reads on disk: metadata split off at load time is put
/// back as a front matter block ahead of the body.
fn raw_fragment(
	reference: &Reference<'_>,
	key: &str,
	text: &str,
	metadata: &Metadata,
) -> TranscludeResult<Fragment> {
	if metadata.is_empty() {
		return Ok(Fragment::keyed(key, text, Metadata::new()));
	}

	let parsed =
		frontmatter::parse(text).map_err(|e| invalid_frontmatter(reference, key, e))?;
	let mut merged = metadata.clone();
	deep_merge(&mut merged, parsed.metadata);
	let content = frontmatter::serialize(&parsed.body, &merged)
		.map_err(|e| invalid_frontmatter(reference, key, e))?;

	Ok(Fragment::keyed(key, content, Metadata::new()))
}

fn text_fragment(
	reference: &Reference<'_>,
	key: &str,
	text: &str,
	mut metadata: Metadata,
) -> TranscludeResult<Fragment> {
	let parsed = frontmatter::parse(text).map_err(|e| invalid_frontmatter(reference, key, e))?;
	deep_merge(&mut metadata, parsed.metadata);

	Ok(Fragment::keyed(key, parsed.body, metadata))
}

fn invalid_frontmatter(
	reference: &Reference<'_>,
	key: &str,
	error: frontmatter::FrontmatterError,
) -> TranscludeError {
	TranscludeError::InvalidFrontmatter {
		document: reference.source_key.to_string(),
		fragment: key.to_string(),
		reason: error.to_string(),
	}
}

/// Resolves a target that names a document of the set exactly, or with the
/// `.md` suffix appended.
#[derive(Debug, Clone, Default)]
pub struct ExactResolver {
	pub extract_frontmatter: bool,
}

impl Resolver for ExactResolver {
	fn name(&self) -> &'static str {
		"exact"
	}

	fn resolve(
		&self,
		reference: &Reference<'_>,
		documents: &DocumentSet,
	) -> TranscludeResult<Option<Resolution>> {
		if reference.is_remote() {
			return Ok(None);
		}
		let Some(joined) = reference.joined_key().filter(|key| !key.is_empty()) else {
			return Ok(None);
		};

		let suffixed = format!("{joined}{MARKDOWN_SUFFIX}");
		for candidate in [joined.as_str(), suffixed.as_str()] {
			if let Some(fragment) =
				document_fragment(reference, documents, candidate, self.extract_frontmatter)?
			{
				return Ok(Some(Resolution::single(self.name(), fragment)));
			}
		}

		Ok(None)
	}
}

/// Resolves a target naming a directory to every eligible document inside it,
/// concatenated in set order.
#[derive(Debug, Clone, Default)]
pub struct FolderResolver {
	pub extract_frontmatter: bool,
	/// Only keys matched by this set are collected. `None` collects all keys.
	pub filter: Option<GlobSet>,
}

impl Resolver for FolderResolver {
	fn name(&self) -> &'static str {
		"folder"
	}

	fn resolve(
		&self,
		reference: &Reference<'_>,
		documents: &DocumentSet,
	) -> TranscludeResult<Option<Resolution>> {
		if reference.is_remote() {
			return Ok(None);
		}
		let Some(joined) = reference.joined_key() else {
			return Ok(None);
		};

		let keys: Vec<&String> = documents
			.keys_under(&joined)
			.filter(|key| self.filter.as_ref().is_none_or(|set| set.is_match(key.as_str())))
			.collect();

		if keys.is_empty() {
			return Ok(None);
		}

		let mut fragments = Vec::with_capacity(keys.len());
		for key in keys {
			if let Some(fragment) =
				document_fragment(reference, documents, key, self.extract_frontmatter)?
			{
				fragments.push(fragment);
			}
		}

		Ok(Some(Resolution {
			resolver: self.name(),
			fragments,
		}))
	}
}

/// Reads targets from a directory on disk instead of the document set.
///
/// With `missing_is_error` set, a local target that does not exist is an
/// error (`MissingSourceFile`) and no later resolver is consulted. Otherwise a
/// miss passes the reference on to the rest of the chain.
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
	pub root: PathBuf,
	pub extract_frontmatter: bool,
	pub missing_is_error: bool,
}

impl FileSystemResolver {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			extract_frontmatter: false,
			missing_is_error: true,
		}
	}
}

impl Resolver for FileSystemResolver {
	fn name(&self) -> &'static str {
		"filesystem"
	}

	fn resolve(
		&self,
		reference: &Reference<'_>,
		_documents: &DocumentSet,
	) -> TranscludeResult<Option<Resolution>> {
		if reference.is_remote() {
			return Ok(None);
		}
		let Some(joined) = reference.joined_key().filter(|key| !key.is_empty()) else {
			return Ok(None);
		};

		let suffixed = format!("{joined}{MARKDOWN_SUFFIX}");
		for candidate in [&joined, &suffixed] {
			let path = self.root.join(candidate);
			if !path.is_file() {
				continue;
			}

			tracing::trace!(path = %path.display(), "reading transclusion source");
			let text = std::fs::read_to_string(&path)?;
			let fragment = if self.extract_frontmatter {
				text_fragment(reference, candidate, &text, Metadata::new())?
			} else {
				Fragment::keyed(candidate.as_str(), text, Metadata::new())
			};

			return Ok(Some(Resolution::single(self.name(), fragment)));
		}

		if !self.missing_is_error {
			tracing::trace!(reference = reference.target, "not found on disk");
			return Ok(None);
		}

		Err(TranscludeError::MissingSourceFile {
			document: reference.source_key.to_string(),
			target: reference.target.to_string(),
			path: self.root.join(&joined).display().to_string(),
		})
	}
}

/// Catch-all that degrades an unresolvable reference to its literal target
/// text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResolver;

impl Resolver for FallbackResolver {
	fn name(&self) -> &'static str {
		"fallback"
	}

	fn resolve(
		&self,
		reference: &Reference<'_>,
		_documents: &DocumentSet,
	) -> TranscludeResult<Option<Resolution>> {
		if reference.is_remote() {
			return Ok(None);
		}

		Ok(Some(Resolution::single(
			self.name(),
			Fragment::literal(reference.target),
		)))
	}
}

/// Adapts a closure into a [`Resolver`].
pub struct FnResolver<F> {
	name: &'static str,
	resolve: F,
}

impl<F> FnResolver<F>
where
	F: Fn(&Reference<'_>, &DocumentSet) -> TranscludeResult<Option<Resolution>>,
{
	pub fn new(name: &'static str, resolve: F) -> Self {
		Self { name, resolve }
	}
}

impl<F> Resolver for FnResolver<F>
where
	F: Fn(&Reference<'_>, &DocumentSet) -> TranscludeResult<Option<Resolution>>,
{
	fn name(&self) -> &'static str {
		self.name
	}

	fn resolve(
		&self,
		reference: &Reference<'_>,
		documents: &DocumentSet,
	) -> TranscludeResult<Option<Resolution>> {
		(self.resolve)(reference, documents)
	}
}

/// Resolvers evaluated in declared order; the first one that returns a
/// resolution wins.
#[derive(Default)]
pub struct ResolverChain {
	resolvers: Vec<Box<dyn Resolver>>,
}

impl ResolverChain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a resolver with the lowest priority so far.
	#[must_use]
	pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
		self.push(resolver);
		self
	}

	/// Append a resolver with the lowest priority so far.
	pub fn push(&mut self, resolver: impl Resolver + 'static) {
		self.resolvers.push(Box::new(resolver));
	}

	/// Insert a resolver ahead of every existing one.
	pub fn prepend(&mut self, resolver: impl Resolver + 'static) {
		self.resolvers.insert(0, Box::new(resolver));
	}

	pub fn names(&self) -> Vec<&'static str> {
		self.resolvers.iter().map(|resolver| resolver.name()).collect()
	}

	pub fn is_empty(&self) -> bool {
		self.resolvers.is_empty()
	}

	pub fn len(&self) -> usize {
		self.resolvers.len()
	}

	pub fn resolve(
		&self,
		reference: &Reference<'_>,
		documents: &DocumentSet,
	) -> TranscludeResult<Option<Resolution>> {
		for resolver in &self.resolvers {
			if let Some(resolution) = resolver.resolve(reference, documents)? {
				return Ok(Some(resolution));
			}
		}

		Ok(None)
	}
}

impl fmt::Debug for ResolverChain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolverChain")
			.field("resolvers", &self.names())
			.finish()
	}
}
