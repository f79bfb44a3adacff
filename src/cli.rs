use std::path::PathBuf;

use clap::Parser;

const DEFAULT_CONFIG_PATH: &str = "config_file/ward.yaml";

/// Command line surface for `wardd`, per SPEC_FULL.md §6: one flag for
/// running in the foreground and one for the configuration file path, in
/// the idiom of the teacher codebase's own debug-info flag.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run in the foreground instead of daemonising.
    #[arg(long)]
    pub foreground: bool,

    /// Path to the YAML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print the resolved CLI arguments and exit.
    #[arg(long)]
    pub print_debug_info: bool,
}

impl Cli {
    /// Parses command line arguments.
    pub fn init() -> Self {
        Self::parse()
    }
}
