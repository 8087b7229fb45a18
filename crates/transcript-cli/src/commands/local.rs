//! Local command - Pick discovered sessions and export them.
//!
//! `--latest` exports the newest session, `--select 0,2` exports the listed
//! positions. Without either, the session table is printed so positions can
//! be picked. Several sessions go into per-session subdirectories under one
//! root with an archive index next to them.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;
use transcript_format::{ArchiveEntry, ArchiveIndex};
use transcript_rollout::discovery::{SessionQuery, SessionRow};

use super::export::{
    default_output_dir, export_rollout, file_stem, output_auto_dir, print_stats,
    resolve_output_dir, ExportFormat, ExportOptions, HTML_FILE,
};
use super::list::{print_table, updated_label};
use super::source::find_sessions;
use crate::html;

pub const INDEX_JSON_FILE: &str = "index.json";

pub fn run(
    codex_home: Option<&Path>,
    query: &SessionQuery,
    show_cwd: bool,
    latest: bool,
    select: Option<&str>,
    format: ExportFormat,
    opts: &ExportOptions,
) -> Result<()> {
    let rows = find_sessions(codex_home, query)?;
    if rows.is_empty() {
        anyhow::bail!("No Codex sessions found under ~/.codex/sessions (or CODEX_HOME).");
    }

    let selected: Vec<&SessionRow> = if latest {
        vec![&rows[0]]
    } else if let Some(select) = select {
        parse_selection(select, rows.len())?
            .into_iter()
            .map(|i| &rows[i])
            .collect()
    } else {
        print_table(&rows, show_cwd);
        println!("\nRe-run with --latest or --select <positions> (e.g. --select 0,2) to export.");
        return Ok(());
    };

    match selected.as_slice() {
        [single] => export_single(single, format, opts),
        many => export_many(many, format, opts),
    }
}

fn export_single(row: &SessionRow, format: ExportFormat, opts: &ExportOptions) -> Result<()> {
    let out_dir = resolve_output_dir(opts.output.as_deref(), opts.output_auto, &row.path)?;
    let exported = export_rollout(&row.path, &out_dir, format, opts)?;
    print_stats(&exported.stats);
    match format {
        ExportFormat::Json => {
            println!("JSON: {}", exported.path.display());
            println!("Output: {}", out_dir.display());
        }
        ExportFormat::Html => println!("Output: {}", exported.path.display()),
    }
    Ok(())
}

fn export_many(rows: &[&SessionRow], format: ExportFormat, opts: &ExportOptions) -> Result<()> {
    let root = opts.output.clone().unwrap_or_else(default_output_dir);
    fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create output directory: {:?}", root))?;

    let now = Utc::now();
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let subdir = output_auto_dir(&root, row.session_id.as_deref(), &file_stem(&row.path));
        let exported = export_rollout(&row.path, &subdir, format, opts)?;
        print_stats(&exported.stats);

        let dir_name = subdir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_name = exported
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        entries.push(ArchiveEntry {
            session_id: row
                .session_id
                .clone()
                .or_else(|| exported.meta.as_ref().and_then(|m| m.id.clone()))
                .unwrap_or_else(|| dir_name.clone()),
            updated: updated_label(row, now),
            updated_ts: row.updated_at.map(|d| d.timestamp()).unwrap_or(0),
            preview: row.preview.clone(),
            href: format!("{}/{}", dir_name, file_name),
        });
    }

    let index = ArchiveIndex::new(entries);
    match format {
        ExportFormat::Html => {
            let path = root.join(HTML_FILE);
            fs::write(&path, html::render_archive_index(&index))
                .with_context(|| format!("Failed to write: {:?}", path))?;
        }
        ExportFormat::Json => {
            let path = root.join(INDEX_JSON_FILE);
            index
                .write_to_path(&path)
                .with_context(|| format!("Failed to write: {:?}", path))?;
        }
    }

    println!("Output root: {}", root.display());
    Ok(())
}

/// Parse `0,2,5` into distinct positions below `len`, in the given order.
pub fn parse_selection(select: &str, len: usize) -> Result<Vec<usize>> {
    let mut positions = Vec::new();
    for part in select.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let position: usize = part
            .parse()
            .with_context(|| format!("Invalid session position: {:?}", part))?;
        if position >= len {
            anyhow::bail!(
                "Session position {} is out of range ({} session(s) listed)",
                position,
                len
            );
        }
        if !positions.contains(&position) {
            positions.push(position);
        }
    }
    if positions.is_empty() {
        anyhow::bail!("No session selected.");
    }
    Ok(positions)
}
