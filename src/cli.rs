use std::path::PathBuf;

use palc::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scriptum", after_long_help = "Embeddable scripting language runner with a demo host surface.")]
pub struct Cli {
	#[command(subcommand)]
	pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
	/// Compile and run a script file, invoking `main` or the named entry
	File { path: PathBuf, entry: Option<String> },
	/// Statement-at-a-time prompt
	Repl,
}
