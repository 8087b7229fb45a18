//! Export command - Write a rollout as `index.html` or `transcript.json`.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use transcript_format::{ParseStats, SessionMeta, TranscriptExport};
use transcript_rollout::discovery::session_id_from_filename;
use transcript_rollout::MirrorPolicy;
use uuid::Uuid;

use super::source::load_transcript_with;
use crate::html;

pub const HTML_FILE: &str = "index.html";
pub const JSON_FILE: &str = "transcript.json";
pub const META_FILE: &str = "session_meta.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Html,
    Json,
}

/// Where and how to write an export.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Output directory; a fresh temp dir when absent
    pub output: Option<PathBuf>,
    /// Treat `output` as a parent and name a per-session subdirectory
    pub output_auto: bool,
    pub include_source: bool,
    /// `owner/name` for commit links, overriding session meta
    pub repo: Option<String>,
    pub policy: MirrorPolicy,
}

/// Result of one export.
#[derive(Debug)]
pub struct Exported {
    /// The written `index.html` or `transcript.json`
    pub path: PathBuf,
    pub meta: Option<SessionMeta>,
    pub stats: ParseStats,
}

pub fn run(rollout: &Path, format: ExportFormat, opts: &ExportOptions) -> Result<()> {
    let out_dir = resolve_output_dir(opts.output.as_deref(), opts.output_auto, rollout)?;
    let exported = export_rollout(rollout, &out_dir, format, opts)?;

    print_stats(&exported.stats);
    if format == ExportFormat::Json {
        println!("JSON: {}", exported.path.display());
        println!("Output: {}", out_dir.display());
    } else {
        println!("Output: {}", exported.path.display());
    }
    Ok(())
}

/// Parse `rollout` and write it into `out_dir`.
///
/// Writes `session_meta.json` next to the export when the session carries
/// metadata, and a copy of the source when asked to.
pub fn export_rollout(
    rollout: &Path,
    out_dir: &Path,
    format: ExportFormat,
    opts: &ExportOptions,
) -> Result<Exported> {
    let export = load_transcript_with(rollout, opts.policy)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;
    if opts.include_source {
        copy_source(rollout, out_dir)?;
    }

    let path = match format {
        ExportFormat::Json => {
            let path = out_dir.join(JSON_FILE);
            export
                .write_to_path(&path)
                .with_context(|| format!("Failed to write: {:?}", path))?;
            path
        }
        ExportFormat::Html => {
            let github_repo = opts
                .repo
                .clone()
                .or_else(|| export.meta.as_ref().and_then(SessionMeta::github_repo));
            let page = html::render_transcript(&export, github_repo.as_deref());
            let path = out_dir.join(HTML_FILE);
            fs::write(&path, page).with_context(|| format!("Failed to write: {:?}", path))?;
            path
        }
    };
    write_session_meta(out_dir, export.meta.as_ref())?;

    info!(
        path = %path.display(),
        loglines = export.stats.emitted_loglines,
        "exported session"
    );

    let TranscriptExport { meta, stats, .. } = export;
    Ok(Exported { path, meta, stats })
}

/// Print the parse summary; drift histograms go to stderr.
pub fn print_stats(stats: &ParseStats) {
    println!(
        "Parsed: {} lines, {} transcript items; system: {}",
        stats.total_lines,
        stats.emitted_loglines,
        stats.system_total()
    );
    if stats.has_drift() {
        eprintln!("System record types (rendered as System cards):");
        for (label, histogram) in stats.histograms() {
            if histogram.is_empty() {
                continue;
            }
            let counts = serde_json::to_string(histogram).unwrap_or_default();
            eprintln!("- {}: {}", label, counts);
        }
    }
}

/// A fresh directory under the system temp dir.
pub fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join(format!("codex-transcripts-{}", Uuid::new_v4()))
}

/// `session_<id>` under `parent`, or the file stem with `:` replaced when
/// the filename carries no session id.
pub fn output_auto_dir(parent: &Path, session_id: Option<&str>, filename: &str) -> PathBuf {
    match session_id {
        Some(id) => parent.join(format!("session_{}", id)),
        None => parent.join(filename.replace(':', "-")),
    }
}

pub fn resolve_output_dir(output: Option<&Path>, output_auto: bool, rollout: &Path) -> Result<PathBuf> {
    let Some(parent) = output else {
        return Ok(default_output_dir());
    };
    let dir = if output_auto {
        output_auto_dir(parent, session_id_from_filename(rollout).as_deref(), &file_stem(rollout))
    } else {
        parent.to_path_buf()
    };
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    Ok(dir)
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "session".to_string())
}

fn write_session_meta(out_dir: &Path, meta: Option<&SessionMeta>) -> Result<()> {
    let Some(meta) = meta else {
        return Ok(());
    };
    let path = out_dir.join(META_FILE);
    let mut body = serde_json::to_string_pretty(meta)?;
    body.push('\n');
    fs::write(&path, body).with_context(|| format!("Failed to write: {:?}", path))
}

fn copy_source(rollout: &Path, out_dir: &Path) -> Result<()> {
    let Some(name) = rollout.file_name() else {
        anyhow::bail!("Source has no file name: {:?}", rollout);
    };
    let dest = out_dir.join(name);
    let same = match (fs::canonicalize(rollout), fs::canonicalize(&dest)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same {
        fs::copy(rollout, &dest).with_context(|| format!("Failed to copy {:?} to {:?}", rollout, dest))?;
    }
    Ok(())
}
