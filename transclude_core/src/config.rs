use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::StageOptions;
use crate::TranscludeError;
use crate::TranscludeResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"transclude.toml",
	".transclude.toml",
	".config/transclude.toml",
];

/// Directory read when the config does not name one.
pub const DEFAULT_SOURCE_DIR: &str = "src";
/// Directory written when the config does not name one.
pub const DEFAULT_DESTINATION_DIR: &str = "build";

/// Configuration loaded from a `transclude.toml` file.
///
/// ```toml
/// source = "content"
/// destination = "public"
/// clean = true
///
/// [exclude]
/// patterns = ["drafts/", "*.tmp"]
///
/// [transclude]
/// pattern = "**/*.md"
/// permalink = true
/// frontmatter = true
/// ```
#[derive(Debug, Deserialize)]
pub struct TranscludeConfig {
	/// Directory containing the documents, relative to the project root.
	#[serde(default = "default_source")]
	pub source: PathBuf,
	/// Directory the transcluded documents are written to.
	#[serde(default = "default_destination")]
	pub destination: PathBuf,
	/// Remove the destination directory before writing.
	#[serde(default)]
	pub clean: bool,
	/// Files and directories left out of the document set.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// When true, `.gitignore` rules are not applied while loading documents.
	#[serde(default)]
	pub disable_gitignore: bool,
	/// Options of the transclusion stage.
	#[serde(default)]
	pub transclude: StageOptions,
}

/// Gitignore-style patterns for files to leave out of the document set.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl Default for TranscludeConfig {
	fn default() -> Self {
		Self {
			source: default_source(),
			destination: default_destination(),
			clean: false,
			exclude: ExcludeConfig::default(),
			disable_gitignore: false,
			transclude: StageOptions::default(),
		}
	}
}

fn default_source() -> PathBuf {
	PathBuf::from(DEFAULT_SOURCE_DIR)
}

fn default_destination() -> PathBuf {
	PathBuf::from(DEFAULT_DESTINATION_DIR)
}

impl TranscludeConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> TranscludeResult<Option<Self>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::parse(&content).map(Some)
	}

	/// Load the discovered config or fall back to the defaults.
	pub fn load_or_default(root: &Path) -> TranscludeResult<Self> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	pub fn parse(content: &str) -> TranscludeResult<Self> {
		toml::from_str(content).map_err(|e| TranscludeError::ConfigParse(e.to_string()))
	}

	pub fn source_dir(&self, root: &Path) -> PathBuf {
		root.join(&self.source)
	}

	pub fn destination_dir(&self, root: &Path) -> PathBuf {
		root.join(&self.destination)
	}

	/// Stage options with `source_root` anchored at the project root.
	pub fn stage_options(&self, root: &Path) -> StageOptions {
		let mut options = self.transclude.clone();
		options.source_root = options.source_root.map(|dir| root.join(dir));
		options
	}
}
