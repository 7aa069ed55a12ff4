use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use transclude_cli::BuildArgs;
use transclude_cli::Commands;
use transclude_cli::OutputFormat;
use transclude_cli::TranscludeCli;
use transclude_core::ErrorPolicy;
use transclude_core::StageReport;
use transclude_core::TranscludeError;
use transclude_core::TranscludeStage;
use transclude_core::parse;
use transclude_core::project::ProjectContext;
use transclude_core::project::load_project;
use transclude_core::project::write_source_tree;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = TranscludeCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Build(build)) => run_build(&args, build),
		Some(Commands::Check { format }) => run_check(&args, *format),
		Some(Commands::List) => run_list(&args),
		None => {
			eprintln!("No subcommand specified. Run `transclude --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<TranscludeError>() {
			Ok(error) => print_diagnostic(*error),
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Logs go to stderr. `--verbose` forces the `debug` level, otherwise
/// `RUST_LOG` decides.
fn init_tracing(verbose: bool, use_color: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::from_default_env()
	};

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.try_init();
}

fn print_diagnostic(error: TranscludeError) {
	let report: miette::Report = error.into();
	eprintln!("{report:?}");
}

fn resolve_root(args: &TranscludeCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

fn load(args: &TranscludeCli) -> Result<ProjectContext, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	tracing::debug!(root = %root.display(), "loading project");
	let ctx = load_project(&root)?;

	if args.verbose {
		println!(
			"Loaded {}: {} document(s), {} other file(s)",
			make_relative(&ctx.source_dir(), &root),
			ctx.tree.documents.len(),
			ctx.tree.assets.len()
		);
	}

	Ok(ctx)
}

fn report_skipped(report: &StageReport) {
	for skipped in &report.skipped {
		eprintln!(
			"{} skipped `{}`: {}",
			colored!("warning:", yellow),
			skipped.key,
			skipped.reason
		);
	}
}

fn report_failures(report: StageReport) {
	for failure in report.failures {
		eprintln!("{} `{}` left untouched", colored!("failed:", red), failure.key);
		print_diagnostic(failure.error);
	}
}

fn run_build(args: &TranscludeCli, build: &BuildArgs) -> Result<(), Box<dyn std::error::Error>> {
	let mut ctx = load(args)?;
	let root = resolve_root(args);

	let mut options = ctx.config.stage_options(&root);
	build.apply(&mut options);
	let stage = TranscludeStage::new(options)?;

	let report = stage.run(&mut ctx.tree.documents)?;
	report_skipped(&report);

	if args.verbose {
		for key in &report.transcluded {
			println!("  transcluded {key}");
		}
	}

	let destination = ctx.destination_dir();
	let destination_display = make_relative(&destination, &root);

	if build.dry_run {
		println!(
			"Dry run: {} document(s) would be transcluded into {destination_display}.",
			report.transcluded.len()
		);
	} else {
		let written = write_source_tree(&ctx.tree, &destination, ctx.config.clean)?;
		println!(
			"{} {} document(s) transcluded, {} unchanged, {} skipped. Wrote {written} file(s) to \
			 {destination_display}.",
			colored!("Built:", green),
			report.transcluded.len(),
			report.unchanged.len(),
			report.skipped.len()
		);
	}

	if report.failures.is_empty() {
		return Ok(());
	}

	let count = report.failures.len();
	report_failures(report);
	Err(format!("{count} document(s) failed to transclude").into())
}

fn run_check(args: &TranscludeCli, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
	let mut ctx = load(args)?;
	let root = resolve_root(args);

	let mut options = ctx.config.stage_options(&root);
	options.error_policy = ErrorPolicy::Collect;
	let stage = TranscludeStage::new(options)?;
	let report = stage.run(&mut ctx.tree.documents)?;

	match format {
		OutputFormat::Json => {
			let failures: Vec<serde_json::Value> = report
				.failures
				.iter()
				.map(|failure| {
					serde_json::json!({
						"document": failure.key,
						"source": failure.error.document(),
						"message": failure.error.to_string(),
					})
				})
				.collect();
			let skipped: Vec<serde_json::Value> = report
				.skipped
				.iter()
				.map(|skipped| {
					serde_json::json!({
						"document": skipped.key,
						"message": skipped.reason.to_string(),
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": report.is_ok(),
				"transcluded": report.transcluded,
				"unchanged": report.unchanged,
				"skipped": skipped,
				"failures": failures,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			report_skipped(&report);

			if report.is_ok() {
				println!(
					"Check passed: {} document(s) transclude cleanly.",
					report.transcluded.len() + report.unchanged.len()
				);
				return Ok(());
			}

			eprintln!(
				"Check failed: {} document(s) with errors.",
				report.failures.len()
			);
			report_failures(report);
			process::exit(1);
		}
	}

	if !report.is_ok() {
		process::exit(1);
	}

	Ok(())
}

fn run_list(args: &TranscludeCli) -> Result<(), Box<dyn std::error::Error>> {
	let ctx = load(args)?;
	let root = resolve_root(args);
	let stage = TranscludeStage::new(ctx.config.stage_options(&root))?;

	let mut document_count = 0;
	let mut directive_count = 0;

	for (key, document) in ctx.tree.documents.iter() {
		if !stage.is_eligible(key) {
			continue;
		}

		let directives = parse(&document.content);
		if directives.is_empty() {
			continue;
		}

		println!("{}", colored!(key, bold));
		for directive in &directives {
			let remote = if directive.is_remote() { " [remote]" } else { "" };
			println!(
				"  :[{}]({}) {}:{}{remote}",
				directive.label, directive.target, directive.position.line, directive.position.column
			);
		}

		document_count += 1;
		directive_count += directives.len();
	}

	if document_count == 0 {
		println!("No transclusion directives found.");
		return Ok(());
	}

	println!("\n{directive_count} directive(s) in {document_count} document(s)");

	Ok(())
}
