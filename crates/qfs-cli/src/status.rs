//! `queryfs status` — blob-store and namespace statistics.

use std::path::Path;

use anyhow::{Context, Result};
use qfs_core::Repository;
use qfs_meta::{Directory, File, Filenode};

pub fn run(root: &Path) -> Result<()> {
    let repository = Repository::open(root)
        .with_context(|| format!("failed to open repository at {}", root.display()))?;

    let stats = repository.blobs().stats()?;
    let session = repository.session();
    let directories = session.query::<Directory>().select().fetch_all()?.len();
    let files = session.query::<File>().select().fetch_all()?.len();
    let filenodes = session.query::<Filenode>().select().fetch_all()?.len();

    println!("Repository {}", root.display());
    println!("  directories: {directories}");
    println!("  files:       {files}");
    println!("  filenodes:   {filenodes}");
    println!(
        "  blobs:       {} ({})",
        stats.blob_count,
        format_bytes(stats.total_bytes)
    );

    Ok(())
}

/// Format bytes in human-readable form.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
