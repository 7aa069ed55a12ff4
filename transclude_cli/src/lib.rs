use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use transclude_core::StageOptions;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Stitch markdown documents together with `:[label](target)` transclusion.",
	long_about = "transclude expands `:[label](target)` directives across a directory of \
	              documents, replacing each directive with the content of the document it \
	              references, recursively.\n\nQuick start:\n  transclude build  Expand the \
	              source directory into the destination\n  transclude check  Verify every \
	              document expands without errors\n  transclude list   Show the directives of \
	              every document"
)]
pub struct TranscludeCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output and debug logging.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Expand every document and write the result to the destination.
	///
	/// Reads the source directory named in `transclude.toml` (default `src`),
	/// expands all eligible documents and writes every file, transcluded or
	/// not, to the destination directory (default `build`).
	Build(BuildArgs),
	/// Check that every document expands without errors.
	///
	/// Runs the expansion in memory and reports unresolved targets, cycles and
	/// invalid front matter. Nothing is written. Exits with a non-zero status
	/// code when any document fails.
	Check {
		/// Output format for check results. Use `text` for human-readable
		/// output or `json` for programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List the transclusion directives of every eligible document.
	List,
}

/// Flags of the `build` command. Each one overrides the matching
/// `[transclude]` option of the config file.
#[derive(Debug, Clone, Default, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct BuildArgs {
	/// Fail on targets that nothing resolves.
	#[arg(long, default_value_t = false, conflicts_with = "fallback")]
	pub strict: bool,

	/// Substitute the literal target for targets that nothing resolves.
	#[arg(long, default_value_t = false)]
	pub fallback: bool,

	/// Precede every substitution with a comment naming its source.
	#[arg(long, default_value_t = false)]
	pub comments: bool,

	/// Move fragment front matter into the metadata of the including
	/// document.
	#[arg(long, default_value_t = false)]
	pub frontmatter: bool,

	/// Expand and report without writing anything.
	#[arg(long, default_value_t = false)]
	pub dry_run: bool,
}

impl BuildArgs {
	/// Apply the flags on top of the configured stage options.
	pub fn apply(&self, options: &mut StageOptions) {
		if self.strict {
			options.fallback = false;
		}
		if self.fallback {
			options.fallback = true;
		}
		if self.comments {
			options.comments = true;
		}
		if self.frontmatter {
			options.frontmatter = true;
		}
	}
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption. Each failure includes the
	/// document key and the error message.
	Json,
}
