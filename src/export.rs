//! Packages generated results for download.
//!
//! A single result is exported as its PNG. Two or more go into one zip
//! archive with one entry per result, in result order.

use crate::error::{AppError, Result};
use crate::model::GeneratedResult;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name used when a result name sanitizes to nothing
const FALLBACK_NAME: &str = "asset";

#[derive(Debug, Clone, PartialEq)]
pub enum ExportArtifact {
    Png { file_name: String, bytes: Vec<u8> },
    Archive { file_name: String, bytes: Vec<u8>, entries: Vec<String> },
}

impl ExportArtifact {
    pub fn file_name(&self) -> &str {
        match self {
            ExportArtifact::Png { file_name, .. } | ExportArtifact::Archive { file_name, .. } => file_name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ExportArtifact::Png { bytes, .. } | ExportArtifact::Archive { bytes, .. } => bytes,
        }
    }

    /// Write the artifact into `dir`, returning the full path.
    pub fn write_into(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.bytes())?;
        info!(path = %path.display(), bytes = self.bytes().len(), "wrote export");
        Ok(path)
    }
}

/// Package `results`. Archives are named `<prefix>-<YYYYMMDD-HHMMSS>.zip`
/// from `now`.
pub fn package(results: &[GeneratedResult], archive_prefix: &str, now: DateTime<Local>) -> Result<ExportArtifact> {
    match results {
        [] => Err(AppError::Export("nothing to export".to_string())),
        [only] => Ok(ExportArtifact::Png {
            file_name: format!("{}.png", sanitize_file_name(&only.name)),
            bytes: only.png.clone(),
        }),
        _ => {
            let entries = entry_names(results);
            let bytes = write_archive(results, &entries)?;
            let file_name = format!("{}-{}.zip", archive_prefix, now.format("%Y%m%d-%H%M%S"));
            info!(%file_name, entries = entries.len(), "packaged archive");
            Ok(ExportArtifact::Archive {
                file_name,
                bytes,
                entries,
            })
        }
    }
}

fn write_archive(results: &[GeneratedResult], entries: &[String]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (result, entry) in results.iter().zip(entries) {
        zip.start_file(entry.as_str(), options)
            .map_err(|e| AppError::Export(format!("{}: {}", entry, e)))?;
        zip.write_all(&result.png)?;
        debug!(%entry, bytes = result.png.len(), "added archive entry");
    }

    let cursor = zip.finish().map_err(|e| AppError::Export(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Unique `.png` entry names, in result order. Repeated names get
/// ` (1)`, ` (2)`... suffixes.
pub fn entry_names(results: &[GeneratedResult]) -> Vec<String> {
    let mut used = HashSet::new();
    results
        .iter()
        .map(|r| {
            let base = sanitize_file_name(&r.name);
            let mut candidate = format!("{}.png", base);
            let mut n = 1;
            while !used.insert(candidate.to_lowercase()) {
                candidate = format!("{} ({}).png", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Replace characters that are not allowed in file names.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
