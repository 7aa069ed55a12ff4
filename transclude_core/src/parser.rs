use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

use crate::lexer::tokenize;

/// A location in the source text. `line` and `column` are 1-indexed, the
/// column counts characters rather than bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Position {
	/// Compute the position of the byte `offset` within `source`.
	pub fn from_offset(source: &str, offset: usize) -> Self {
		let before = &source[..offset.min(source.len())];
		let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);

		Self {
			line: before.matches('\n').count() + 1,
			column: before[line_start..].chars().count() + 1,
			offset,
		}
	}
}

/// A parsed `:[label](target secondary)` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
	/// Display-only label between the brackets. May be empty.
	pub label: String,
	/// The raw reference as written.
	pub target: String,
	/// Optional whitespace-separated token after the target, with surrounding
	/// quotes removed. Ignored by the built-in resolvers.
	pub secondary: Option<String>,
	/// Byte range of the whole directive in the source.
	pub span: Range<usize>,
	/// Position of the leading `:`.
	pub position: Position,
}

impl Directive {
	/// Whether the target is an absolute URL (`scheme:` or `//host`). Local
	/// resolvers never claim these.
	pub fn is_remote(&self) -> bool {
		is_remote_target(&self.target)
	}

	/// The exact directive text as it appears in `source`.
	pub fn source<'a>(&self, source: &'a str) -> &'a str {
		&source[self.span.clone()]
	}

	/// Render the directive back to text, optionally with another target.
	pub fn render_with_target(&self, target: &str) -> String {
		match &self.secondary {
			Some(secondary) => format!(":[{}]({target} {secondary})", self.label),
			None => format!(":[{}]({target})", self.label),
		}
	}
}

/// Parse `content` and return every directive found, ordered by position.
pub fn parse(content: impl AsRef<str>) -> Vec<Directive> {
	let content = content.as_ref();

	tokenize(content)
		.into_iter()
		.map(|raw| {
			Directive {
				label: content[raw.label].to_string(),
				target: content[raw.target].to_string(),
				secondary: raw
					.secondary
					.map(|range| unquote(content[range].trim()).to_string())
					.filter(|secondary| !secondary.is_empty()),
				position: Position::from_offset(content, raw.span.start),
				span: raw.span,
			}
		})
		.collect()
}

/// Returns true when `content` contains at least one directive.
pub fn has_directives(content: impl AsRef<str>) -> bool {
	!tokenize(content.as_ref()).is_empty()
}

/// Check whether a target carries a URL scheme (`https:`, `mailto:`) or is
/// protocol-relative (`//host/path`).
pub fn is_remote_target(target: &str) -> bool {
	if target.starts_with("//") {
		return true;
	}

	let Some((scheme, _)) = target.split_once(':') else {
		return false;
	};

	// Single letters are drive prefixes, not schemes.
	scheme.len() > 1
		&& scheme.starts_with(|c: char| c.is_ascii_alphabetic())
		&& scheme
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn unquote(value: &str) -> &str {
	for quote in ['"', '\''] {
		if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
			return &value[1..value.len() - 1];
		}
	}

	value
}
