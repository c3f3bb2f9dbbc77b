//! Main entry point for the zipmode CLI application.
//!
//! This binary audits the POSIX permissions recorded in a ZIP archive's
//! central directory, reading from the local filesystem or from a remote
//! HTTP URL, and can re-apply those permissions to already-extracted files.

use anyhow::Result;
use clap::Parser;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use zipmode::{Cli, HttpRangeReader, LocalFileReader, PermissionFixer, PosixPermissions, ReadAt};

/// Application entry point.
///
/// Parses command-line arguments and dispatches to the appropriate source
/// based on whether the input is a local file or HTTP URL.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.is_http_url() {
        // Handle remote ZIP file via HTTP Range requests
        let reader = HttpRangeReader::new(cli.file.clone())?;
        let transferred_before = reader.transferred_bytes();
        let reader = Arc::new(reader);

        process_zip(reader.clone(), &cli)?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            let transferred = reader.transferred_bytes() - transferred_before;
            eprintln!("\nTotal bytes transferred: {}", format_size(transferred));
        }
    } else {
        // Handle local ZIP file
        let reader = Arc::new(LocalFileReader::new(Path::new(&cli.file))?);
        process_zip(reader, &cli)?;
    }

    Ok(())
}

/// Walk the archive's central directory based on CLI options.
///
/// Two modes:
/// - List mode (default): print each Unix entry with its permissions
/// - Apply mode (`-d DIR`): chmod the matching already-extracted file
///   under DIR for each Unix entry
fn process_zip<R: ReadAt>(reader: Arc<R>, cli: &Cli) -> Result<()> {
    let fixer = PermissionFixer::new(reader);

    let fixed = match &cli.apply_to {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            fixer.fix_entries(|name, permissions| apply_permissions(&dir, name, permissions))?
        }
        None => fixer.fix_entries(|name, permissions| {
            if !cli.is_quiet() {
                if cli.numeric {
                    println!("{:03o} {}", permissions.mode(), name);
                } else {
                    println!("{permissions} {name}");
                }
            }
            Ok(())
        })?,
    };

    if !cli.is_very_quiet() {
        eprintln!("{fixed} unix entries");
    }

    Ok(())
}

/// Apply one entry's permissions to the matching extracted file.
///
/// Entry names come from an untrusted archive: absolute paths and parent
/// components are refused so the fix pass cannot escape `dir`.
fn apply_permissions(dir: &Path, name: &str, permissions: PosixPermissions) -> io::Result<()> {
    let relative = Path::new(name);
    if relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing entry path `{name}`"),
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let target = dir.join(relative);
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(permissions.mode()))
    }

    #[cfg(not(unix))]
    {
        let _ = (dir, permissions);
        Err(io::Error::other("--apply-to requires a POSIX filesystem"))
    }
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
