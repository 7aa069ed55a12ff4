use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TranscludeError {
	#[error(transparent)]
	#[diagnostic(code(transclude::io_error))]
	Io(#[from] std::io::Error),

	#[error("unresolved transclusion target `{target}` in `{document}`")]
	#[diagnostic(
		code(transclude::unresolved_target),
		help(
			"check that `{target}` exists relative to `{document}`, or enable the fallback \
			 resolver to keep unresolved targets as plain text"
		)
	)]
	UnresolvedTarget { document: String, target: String },

	#[error("cyclic transclusion of `{target}` in `{document}`: {chain}")]
	#[diagnostic(
		code(transclude::cyclic_transclusion),
		help("a document cannot transclude itself, directly or through another document")
	)]
	CyclicTransclusion {
		document: String,
		target: String,
		chain: String,
	},

	#[error("invalid front matter in `{fragment}` (transcluded by `{document}`): {reason}")]
	#[diagnostic(
		code(transclude::invalid_frontmatter),
		help("front matter must be a YAML mapping between two `---` lines")
	)]
	InvalidFrontmatter {
		document: String,
		fragment: String,
		reason: String,
	},

	#[error("missing source file `{path}` for target `{target}` in `{document}`")]
	#[diagnostic(
		code(transclude::missing_source_file),
		help("set `skip_missing = true` to leave documents with missing sources untouched")
	)]
	MissingSourceFile {
		document: String,
		target: String,
		path: String,
	},

	#[error("metadata key `{key}` in `{document}` is already in use")]
	#[diagnostic(
		code(transclude::reserved_key_conflict),
		help("choose another `metadata_key` or rename the existing `{key}` field")
	)]
	ReservedKeyConflict { document: String, key: String },

	#[error("invalid document pattern `{pattern}`: {reason}")]
	#[diagnostic(code(transclude::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(transclude::config_parse),
		help("check that transclude.toml is valid TOML with an optional [transclude] section")
	)]
	ConfigParse(String),
}

impl TranscludeError {
	/// The key of the document whose processing produced this error, if any.
	pub fn document(&self) -> Option<&str> {
		match self {
			Self::UnresolvedTarget { document, .. }
			| Self::CyclicTransclusion { document, .. }
			| Self::InvalidFrontmatter { document, .. }
			| Self::MissingSourceFile { document, .. }
			| Self::ReservedKeyConflict { document, .. } => Some(document),
			Self::Io(_) | Self::InvalidPattern { .. } | Self::ConfigParse(_) => None,
		}
	}

	pub fn is_missing_source(&self) -> bool {
		matches!(self, Self::MissingSourceFile { .. })
	}
}

pub type TranscludeResult<T> = Result<T, TranscludeError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
