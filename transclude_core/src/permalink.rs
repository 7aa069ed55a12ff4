//! Rewrites extensionless directive targets to the document they denote when
//! permalinks strip the `.md` suffix from authored links.

use crate::DocumentSet;
use crate::parser::parse;
use crate::path::join_key;
use crate::resolver::MARKDOWN_SUFFIX;

const INDEX_DOCUMENT: &str = "index.md";

/// Rewrite each directive in `content` whose target is not a key of the set
/// but `<target>.md` or `<target>/index.md` is. Other directives are left for
/// the resolver chain.
pub fn rewrite_targets(content: &str, source_key: &str, documents: &DocumentSet) -> String {
	let directives = parse(content);
	if directives.is_empty() {
		return content.to_string();
	}

	let mut result = String::with_capacity(content.len());
	let mut cursor = 0;

	for directive in &directives {
		let Some(target) = discover_target(&directive.target, source_key, documents) else {
			continue;
		};

		tracing::debug!(
			document = source_key,
			from = %directive.target,
			to = %target,
			"permalink rewrite"
		);
		result.push_str(&content[cursor..directive.span.start]);
		result.push_str(&directive.render_with_target(&target));
		cursor = directive.span.end;
	}

	result.push_str(&content[cursor..]);
	result
}

fn discover_target(target: &str, source_key: &str, documents: &DocumentSet) -> Option<String> {
	if crate::parser::is_remote_target(target) {
		return None;
	}

	let joined = join_key(source_key, target)?;
	if documents.contains_key(&joined) {
		return None;
	}

	if !target.ends_with('/') && documents.contains_key(&format!("{joined}{MARKDOWN_SUFFIX}")) {
		return Some(format!("{target}{MARKDOWN_SUFFIX}"));
	}

	let index_key = if joined.is_empty() {
		INDEX_DOCUMENT.to_string()
	} else {
		format!("{joined}/{INDEX_DOCUMENT}")
	};
	if documents.contains_key(&index_key) {
		return Some(format!("{}/{INDEX_DOCUMENT}", target.trim_end_matches('/')));
	}

	None
}
