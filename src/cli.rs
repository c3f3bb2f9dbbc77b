use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "zipmode")]
#[command(version)]
#[command(about = "Audit and fix POSIX permissions of ZIP entries", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipmode app.jar                          list unix entries with their permissions\n  \
  zipmode -d unpacked/ app.jar             chmod already-extracted files under unpacked/\n  \
  zipmode https://example.com/app.jar      audit a remote archive via Range requests")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Apply each entry's permissions to the matching file under DIR
    #[arg(short = 'd', long = "apply-to", value_name = "DIR")]
    pub apply_to: Option<String>,

    /// Print numeric modes instead of rwx strings
    #[arg(short = 'n', long)]
    pub numeric: bool,

    /// Quiet mode (no per-entry output)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }
}
