use schemars::schema_for;
use schemars::JsonSchema;
use std::fs;
use std::path::{Path, PathBuf};

use transcript_format::{
    ArchiveIndex, ContentBlock, ConversationGroup, Logline, ParseStats, SessionMeta,
    TranscriptExport,
};

fn write_schema<T: JsonSchema>(
    out_dir: &Path,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema_for!(T);
    let json = serde_json::to_string_pretty(&schema)?;
    fs::write(out_dir.join(format!("{name}.json")), json)?;
    Ok(())
}

fn schema_output_dir() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.join("../../schema")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = schema_output_dir();
    fs::create_dir_all(&out_dir)?;

    write_schema::<Logline>(&out_dir, "logline")?;
    write_schema::<ContentBlock>(&out_dir, "content_block")?;
    write_schema::<SessionMeta>(&out_dir, "session_meta")?;
    write_schema::<ParseStats>(&out_dir, "parse_stats")?;
    write_schema::<ConversationGroup>(&out_dir, "conversation_group")?;
    write_schema::<TranscriptExport>(&out_dir, "transcript")?;
    write_schema::<ArchiveIndex>(&out_dir, "archive_index")?;

    Ok(())
}
