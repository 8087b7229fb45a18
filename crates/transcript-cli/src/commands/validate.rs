//! Validate command - Check a transcript export for invariant violations.

use anyhow::Result;
use std::path::Path;
use transcript_format::{validate_default, TranscriptExport};

use super::source::load_transcript;

pub fn run(path: &Path) -> Result<()> {
    println!("🔍 Validating: {:?}\n", path);

    let export = load_transcript(path)?;
    let result = validate_default(&export);

    if result.is_valid() && result.warnings.is_empty() {
        println!("✅ Transcript is valid!");
        print_summary(&export);
        return Ok(());
    }

    if !result.errors.is_empty() {
        println!("❌ Errors ({}):", result.errors.len());
        for error in &result.errors {
            println!("   • {}", error);
        }
        println!();
    }

    if !result.warnings.is_empty() {
        println!("⚠️  Warnings ({}):", result.warnings.len());
        for warning in &result.warnings {
            println!("   • {}", warning);
        }
        println!();
    }

    if !result.is_valid() {
        anyhow::bail!("Validation failed with {} error(s)", result.errors.len());
    }
    println!("✅ Transcript is valid (with warnings)");
    print_summary(&export);
    Ok(())
}

fn print_summary(export: &TranscriptExport) {
    let session = export
        .meta
        .as_ref()
        .and_then(|m| m.id.as_deref())
        .unwrap_or("(unknown)");
    println!("   Format:   {}", export.format);
    println!("   Session:  {}", session);
    println!(
        "   Loglines: {} ({} system)",
        export.loglines().len(),
        export.stats.system_total()
    );
    if export.stats.has_drift() {
        println!("   Drift:    unrecognized record types were rendered as system cards");
    }
}
