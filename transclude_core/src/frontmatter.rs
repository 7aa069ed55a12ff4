//! YAML front matter splitting and re-serialization.

use thiserror::Error;

use crate::Metadata;

const OPENING_DELIMITER: &str = "---";
const CLOSING_DELIMITERS: [&str; 2] = ["---", "..."];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FrontmatterError {
	#[error("{0}")]
	Invalid(String),
}

/// Text split into its front matter and the remaining body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
	pub body: String,
	pub metadata: Metadata,
}

/// Split `text` into structured metadata and body.
///
/// Text that does not open with a `---` line, or never closes its header, has
/// no front matter and is returned as the body unchanged.
pub fn parse(text: &str) -> Result<Parsed, FrontmatterError> {
	let Some((header, body)) = split(text) else {
		return Ok(Parsed {
			body: text.to_string(),
			metadata: Metadata::new(),
		});
	};

	Ok(Parsed {
		body: body.to_string(),
		metadata: parse_header(header)?,
	})
}

/// Returns true when `text` opens with a complete front matter block.
pub fn has_frontmatter(text: &str) -> bool {
	split(text).is_some()
}

/// Prepend `metadata` as a front matter block to `body`. Empty metadata
/// leaves the body untouched.
pub fn serialize(body: &str, metadata: &Metadata) -> Result<String, FrontmatterError> {
	if metadata.is_empty() {
		return Ok(body.to_string());
	}

	let yaml =
		serde_yaml_ng::to_string(metadata).map_err(|e| FrontmatterError::Invalid(e.to_string()))?;

	let mut result = String::with_capacity(yaml.len() + body.len() + 8);
	result.push_str(OPENING_DELIMITER);
	result.push('\n');
	result.push_str(&yaml);
	if !yaml.ends_with('\n') {
		result.push('\n');
	}
	result.push_str(OPENING_DELIMITER);
	result.push('\n');
	result.push_str(body);

	Ok(result)
}

fn parse_header(header: &str) -> Result<Metadata, FrontmatterError> {
	if header.trim().is_empty() {
		return Ok(Metadata::new());
	}

	let value: serde_json::Value =
		serde_yaml_ng::from_str(header).map_err(|e| FrontmatterError::Invalid(e.to_string()))?;

	match value {
		serde_json::Value::Object(map) => Ok(map),
		serde_json::Value::Null => Ok(Metadata::new()),
		other => {
			Err(FrontmatterError::Invalid(format!(
				"expected a mapping, found {}",
				value_kind(&other)
			)))
		}
	}
}

/// Locate the header and body slices of a front matter block.
fn split(text: &str) -> Option<(&str, &str)> {
	let first_line_end = text.find('\n')?;
	if text[..first_line_end].trim_end() != OPENING_DELIMITER {
		return None;
	}

	let header_start = first_line_end + 1;
	let mut line_start = header_start;

	while line_start <= text.len() {
		let line_end = text[line_start..]
			.find('\n')
			.map_or(text.len(), |idx| line_start + idx);
		let line = text[line_start..line_end].trim_end();

		if CLOSING_DELIMITERS.contains(&line) {
			let body_start = (line_end + 1).min(text.len());
			return Some((&text[header_start..line_start], &text[body_start..]));
		}

		if line_end == text.len() {
			break;
		}
		line_start = line_end + 1;
	}

	None
}

fn value_kind(value: &serde_json::Value) -> &'static str {
	match value {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "a boolean",
		serde_json::Value::Number(_) => "a number",
		serde_json::Value::String(_) => "a string",
		serde_json::Value::Array(_) => "a sequence",
		serde_json::Value::Object(_) => "a mapping",
	}
}
