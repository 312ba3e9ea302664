use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Inspect and validate component templates.",
	long_about = "tml parses component templates (namespaced XML with reserved elements for \
	              components, block parameters, layout inheritance and body insertion) into the \
	              token sequences a renderer consumes.\n\nQuick start:\n  tml parse Page.tml    \
	              Print the tokens of a template\n  tml check **/*.tml    Verify that templates \
	              parse cleanly"
)]
pub struct TmlCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory, where `tml.toml` is looked up.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Parse a template and print what it contains.
	///
	/// Prints the token sequence, the declared component ids, whether the
	/// template extends a parent, and the override token sequences for each
	/// extension point or replacement.
	Parse {
		/// The template file to parse.
		file: PathBuf,

		/// Output format. Use `text` for a human-readable listing or `json`
		/// for programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Keep all whitespace in template text instead of compressing it.
		#[arg(long, default_value_t = false)]
		preserve_whitespace: bool,
	},
	/// Check that templates parse without errors.
	///
	/// Every file is parsed independently; each failure is reported as a
	/// diagnostic. Exits with a non-zero status code if any template fails.
	Check {
		/// The template files to check.
		#[arg(required = true)]
		files: Vec<PathBuf>,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable token listing.
	Text,
	/// The parsed template serialized as JSON.
	Json,
}
