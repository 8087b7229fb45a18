//! View command - Print session content to stdout (non-interactive).

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;

use super::source::load_transcript;
use crate::units::{
    build_message_units, filter_units, group_units_by_prompt, MessageUnit, UnitKind,
};

/// Body lines printed per unit before eliding the rest.
const MAX_BODY_LINES: usize = 20;

pub fn run(path: &Path, json: bool, kinds: Option<&str>, query: Option<&str>) -> Result<()> {
    let export = load_transcript(path)?;
    let kinds = match kinds {
        Some(list) => parse_kinds(list)?,
        None => UnitKind::ALL.into_iter().collect(),
    };
    let query = query.unwrap_or("");

    let units = build_message_units(export.loglines());

    if json {
        // In JSON mode, output units as a flat JSON array
        let shown = filter_units(&units, &kinds, query);
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    let visible = |u: &MessageUnit| kinds.contains(&u.kind) && u.matches(query);
    for (n, group) in group_units_by_prompt(&units).iter().enumerate() {
        let shown: Vec<&MessageUnit> = group.units.iter().copied().filter(|&u| visible(u)).collect();
        if shown.is_empty() {
            continue;
        }

        match group.prompt {
            Some(prompt) => println!("=== #{} [{}] {} ===", n + 1, prompt.timestamp, prompt.title),
            None => println!("=== #{} [{}] (no prompt yet) ===", n + 1, shown[0].timestamp),
        }
        for unit in shown {
            print_unit(unit);
        }
        println!();
    }

    Ok(())
}

fn print_unit(unit: &MessageUnit) {
    println!(
        "[{}] {}: {}",
        unit.timestamp,
        unit.kind.as_str().to_uppercase(),
        unit.title
    );
    let body: Vec<&str> = unit.lines.iter().flat_map(|l| l.lines()).collect();
    for line in body.iter().take(MAX_BODY_LINES) {
        println!("  {}", line);
    }
    if body.len() > MAX_BODY_LINES {
        println!("  ... ({} more lines)", body.len() - MAX_BODY_LINES);
    }
}

fn parse_kinds(list: &str) -> Result<BTreeSet<UnitKind>> {
    list.split(',')
        .filter(|name| !name.trim().is_empty())
        .map(|name| {
            UnitKind::parse(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown type {:?} (expected user, assistant, tool_call, tool_result, thinking, system)",
                    name.trim()
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        let kinds = parse_kinds("user, tool-result").unwrap();
        assert!(kinds.contains(&UnitKind::User));
        assert!(kinds.contains(&UnitKind::ToolResult));
        assert_eq!(kinds.len(), 2);
        assert!(parse_kinds("user,nope").is_err());
    }
}
