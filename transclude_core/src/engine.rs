use std::borrow::Cow;

use crate::Directive;
use crate::DocumentSet;
use crate::TranscludeError;
use crate::TranscludeResult;
use crate::metadata::MetadataTree;
use crate::parser::parse;
use crate::permalink::rewrite_targets;
use crate::resolver::Fragment;
use crate::resolver::Reference;
use crate::resolver::ResolverChain;

/// Switches that change how substituted content is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExpandOptions {
	/// Precede every substituted document with a comment naming its key.
	pub comments: bool,
	/// Add the target, resolver and calling document to those comments.
	pub verbose: bool,
	/// Rewrite extensionless targets before each scan.
	pub permalink: bool,
}

/// The fully expanded content of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
	/// Content with every local directive replaced.
	pub content: String,
	/// Metadata of every transcluded descendant, keyed by resolved key.
	pub tree: MetadataTree,
	/// Distinct keys pulled in, in first-resolution order.
	pub resolved: Vec<String>,
}

impl Expansion {
	/// Whether any directive was substituted.
	pub fn changed(&self, original: &str) -> bool {
		self.content != original
	}
}

/// Accumulator threaded through the recursion for a single top-level
/// document.
#[derive(Debug)]
struct ExpansionState {
	/// Keys on the active recursion path, top-level document first.
	stack: Vec<String>,
	tree: MetadataTree,
	resolved: Vec<String>,
}

impl ExpansionState {
	fn new(key: &str) -> Self {
		Self {
			stack: vec![key.to_string()],
			tree: MetadataTree::new(),
			resolved: Vec::new(),
		}
	}

	fn chain_to(&self, key: &str) -> String {
		let mut chain: Vec<&str> = self.stack.iter().map(String::as_str).collect();
		chain.push(key);
		chain.join(" -> ")
	}
}

/// Recursively resolves directives against a document set.
#[derive(Debug)]
pub struct Engine<'a> {
	documents: &'a DocumentSet,
	resolvers: &'a ResolverChain,
	options: ExpandOptions,
}

impl<'a> Engine<'a> {
	pub fn new(
		documents: &'a DocumentSet,
		resolvers: &'a ResolverChain,
		options: ExpandOptions,
	) -> Self {
		Self {
			documents,
			resolvers,
			options,
		}
	}

	/// Expand the document stored at `key` in the set. Returns `None` when the
	/// key is unknown.
	pub fn expand_document(&self, key: &str) -> TranscludeResult<Option<Expansion>> {
		let Some(document) = self.documents.get(key) else {
			return Ok(None);
		};

		self.expand(key, &document.content).map(Some)
	}

	/// Expand `content` as if it were the document at `key`: relative targets
	/// resolve against the directory of `key` and `key` itself counts as
	/// already being on the expansion path.
	#[tracing::instrument(level = "debug", skip_all, fields(document = key))]
	pub fn expand(&self, key: &str, content: &str) -> TranscludeResult<Expansion> {
		let mut state = ExpansionState::new(key);
		let content = self.expand_content(key, content, &mut state)?;

		Ok(Expansion {
			content,
			tree: state.tree,
			resolved: state.resolved,
		})
	}

	fn expand_content(
		&self,
		context_key: &str,
		content: &str,
		state: &mut ExpansionState,
	) -> TranscludeResult<String> {
		let content = if self.options.permalink {
			Cow::Owned(rewrite_targets(content, context_key, self.documents))
		} else {
			Cow::Borrowed(content)
		};

		let directives = parse(content.as_ref());
		if directives.is_empty() {
			return Ok(content.into_owned());
		}

		let mut result = String::with_capacity(content.len());
		let mut cursor = 0;

		for directive in &directives {
			result.push_str(&content[cursor..directive.span.start]);
			cursor = directive.span.end;

			let reference = Reference {
				target: &directive.target,
				label: &directive.label,
				secondary: directive.secondary.as_deref(),
				source_key: context_key,
			};

			let Some(resolution) = self.resolvers.resolve(&reference, self.documents)? else {
				if directive.is_remote() {
					tracing::debug!(reference = %directive.target, "leaving remote target untouched");
					result.push_str(directive.source(&content));
					continue;
				}

				return Err(TranscludeError::UnresolvedTarget {
					document: context_key.to_string(),
					target: directive.target.clone(),
				});
			};

			tracing::debug!(
				reference = %directive.target,
				resolver = resolution.resolver,
				fragments = resolution.fragments.len(),
				"resolved directive"
			);

			for fragment in resolution.fragments {
				self.substitute(
					context_key,
					directive,
					resolution.resolver,
					fragment,
					state,
					&mut result,
				)?;
			}
		}

		result.push_str(&content[cursor..]);
		Ok(result)
	}

	fn substitute(
		&self,
		context_key: &str,
		directive: &Directive,
		resolver: &str,
		fragment: Fragment,
		state: &mut ExpansionState,
		result: &mut String,
	) -> TranscludeResult<()> {
		let Some(key) = fragment.key else {
			result.push_str(&fragment.content);
			return Ok(());
		};

		if state.stack.contains(&key) {
			return Err(TranscludeError::CyclicTransclusion {
				document: context_key.to_string(),
				target: directive.target.clone(),
				chain: state.chain_to(&key),
			});
		}

		tracing::trace!(key = %key, "expanding fragment");

		if self.options.comments {
			result.push_str(&self.marker(context_key, directive, resolver, &key));
		}

		state.tree.insert(&key, &fragment.metadata);
		if !state.resolved.contains(&key) {
			state.resolved.push(key.clone());
		}

		state.stack.push(key.clone());
		let expanded = self.expand_content(&key, &fragment.content, state);
		state.stack.pop();

		result.push_str(&expanded?);
		Ok(())
	}

	fn marker(&self, context_key: &str, directive: &Directive, resolver: &str, key: &str) -> String {
		if self.options.verbose {
			format!(
				"<!-- transclude: {key} (target: {}, resolver: {resolver}, from: {context_key}) \
				 -->\n",
				directive.target
			)
		} else {
			format!("<!-- transclude: {key} -->\n")
		}
	}
}
