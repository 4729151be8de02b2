//! Main entry point for the zipdrop CLI application.
//!
//! Packages files from disk into an archive in the target directory, or lists
//! an existing archive.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use zipdrop::{
    ArchiveExportOrchestrator, CancellationToken, Cli, DeflateBackend, DirectorySink, ExportError,
    ExportMethod, FileEntry, LocalFileReader, Progress, UserPrompt, ZipExtractor,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(archive) = &cli.list {
        return list_archive(archive).await;
    }

    export(&cli).await
}

/// Package the files named on the command line.
async fn export(cli: &Cli) -> Result<()> {
    let entries: Vec<FileEntry> = cli
        .files
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            FileEntry::from_path(name, path)
        })
        .collect();

    tokio::fs::create_dir_all(&cli.dir)
        .await
        .with_context(|| format!("Failed to create {}", cli.dir.display()))?;

    let sink = Arc::new(DirectorySink::new(&cli.dir).overwrite(cli.force));
    let prompt = Arc::new(TerminalPrompt { assume_yes: cli.yes });
    let mut exporter =
        ArchiveExportOrchestrator::new(sink, prompt).with_options(cli.export_options());
    if !cli.store {
        exporter = exporter.with_backend(Arc::new(DeflateBackend::default()));
    }

    // Ctrl-C cancels between two units of work.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let progress = |event: &Progress| -> Result<()> {
        match event {
            Progress::Status(text) => info!("{text}"),
            Progress::Percent(pct) => debug!("{pct}%"),
        }
        Ok(())
    };

    let result = exporter
        .export_archive(&entries, &cli.output, &progress, &cancel)
        .await;

    match result.method {
        ExportMethod::Compressed | ExportMethod::Stored => {
            let name = result.filename.unwrap_or_default();
            println!("{} ({})", cli.dir.join(name).display(), result.method);
        }
        ExportMethod::Direct => {
            println!("copied {} files to {}", result.delivered, cli.dir.display());
            if let Some(note) = result.error {
                eprintln!("warning: {note}");
            }
        }
        ExportMethod::Cancelled => {
            eprintln!("cancelled");
            std::process::exit(130);
        }
        ExportMethod::Failed => {
            bail!(result.error.unwrap_or_else(|| "export failed".to_string()))
        }
    }

    Ok(())
}

/// Asks on the terminal, unless `-y` was given.
struct TerminalPrompt {
    assume_yes: bool,
}

impl TerminalPrompt {
    async fn ask(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let mut stderr = tokio::io::stderr();
        if stderr
            .write_all(format!("{question} [y/N] ").as_bytes())
            .await
            .is_err()
        {
            return false;
        }
        let _ = stderr.flush().await;

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl UserPrompt for TerminalPrompt {
    async fn confirm_direct_delivery(&self, count: usize) -> bool {
        self.ask(&format!(
            "Could not create an archive. Copy {count} files individually?"
        ))
        .await
    }

    async fn continue_after_failure(&self, filename: &str, error: &ExportError) -> bool {
        self.ask(&format!("{error}. Continue with the remaining files after {filename}?"))
            .await
    }
}

/// Print the entries of an archive on disk.
async fn list_archive(path: &Path) -> Result<()> {
    let reader = Arc::new(LocalFileReader::new(path)?);
    let extractor = ZipExtractor::new(reader);
    let entries = extractor.list_files().await?;

    println!(
        "{:>10}  {:>10}  {:>8}  {:>10}  {:>5}  Name",
        "Length", "Size", "Method", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total = 0u64;
    for entry in &entries {
        let (year, month, day) = entry.modified.ymd();
        let (hour, minute, _second) = entry.modified.hms();
        let method = match entry.compression_method.as_u16() {
            0 => "stored",
            8 => "deflate",
            _ => "other",
        };
        println!(
            "{:>10}  {:>10}  {:>8}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            method,
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );
        total += entry.uncompressed_size;
    }

    println!("{}", "-".repeat(70));
    println!("{:>10}  {} files", format_size(total), entries.len());

    Ok(())
}

/// Format a byte size into a human-readable string.
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
