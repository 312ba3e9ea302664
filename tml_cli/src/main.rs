use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use tml_cli::Commands;
use tml_cli::OutputFormat;
use tml_cli::TmlCli;
use tml_core::ComponentTemplate;
use tml_core::ParseOptions;
use tml_core::TemplateError;
use tml_core::TemplateParser;
use tml_core::TmlConfig;
use tracing_subscriber::EnvFilter;

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
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = TmlCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_logging(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Parse {
			file,
			format,
			preserve_whitespace,
		}) => run_parse(&args, file, *format, *preserve_whitespace),
		Some(Commands::Check { files }) => run_check(&args, files),
		None => {
			eprintln!("No subcommand specified. Run `tml --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<TemplateError>() {
			Ok(error) => eprintln!("{:?}", miette::Report::new(*error)),
			Err(e) => eprintln!("{} {e}", colored!("error:", red)),
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` selects what is logged unless `--verbose` asks
/// for everything the parser reports.
fn init_logging(verbose: bool, use_color: bool) {
	let filter = if verbose {
		EnvFilter::new("tml_core=debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
	};

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.try_init();
}

fn resolve_root(args: &TmlCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_parser(args: &TmlCli) -> Result<TemplateParser, TemplateError> {
	let root = resolve_root(args);
	let config = TmlConfig::load(&root)?;

	Ok(TemplateParser::from_config(&root, config.as_ref()))
}

fn run_parse(
	args: &TmlCli,
	file: &Path,
	format: OutputFormat,
	preserve_whitespace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let mut parser = load_parser(args)?;

	if preserve_whitespace {
		parser = parser.with_options(ParseOptions {
			compress_whitespace: false,
		});
	}

	let template = parser.parse_file(file)?;

	match format {
		OutputFormat::Text => print_template(&template),
		OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&template)?),
	}

	Ok(())
}

fn print_template(template: &ComponentTemplate) {
	println!("{}", colored!(template.resource(), bold));

	println!("tokens:");
	for token in template.tokens() {
		println!("  {token}");
	}

	let ids: Vec<_> = template.component_ids().keys().collect();
	if ids.is_empty() {
		println!("component ids: (none)");
	} else {
		println!("component ids: {}", ids.join(", "));
	}

	println!("extends: {}", if template.has_extension() { "yes" } else { "no" });

	if let Some(overrides) = template.overrides() {
		for (id, tokens) in overrides.iter() {
			println!("override {id}:");
			for token in tokens {
				println!("  {token}");
			}
		}
	}
}

fn run_check(args: &TmlCli, files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
	let parser = load_parser(args)?;
	let mut failures = 0_usize;

	for file in files {
		match parser.parse_file(file) {
			Ok(_) => println!("{} {}", colored!("ok", green), file.display()),
			Err(error) => {
				failures += 1;
				eprintln!("{:?}", miette::Report::new(error));
			}
		}
	}

	if failures > 0 {
		eprintln!(
			"{} {failures} of {} template(s) failed to parse",
			colored!("error:", red),
			files.len()
		);
		process::exit(1);
	}

	Ok(())
}
