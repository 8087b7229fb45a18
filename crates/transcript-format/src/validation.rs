//! Validation utilities for transcript exports.

use crate::{parse_timestamp, ContentBlock, TranscriptExport, ValidationError};

/// Validation options.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Check that `stats.emitted_loglines` matches the logline count
    pub check_stats_consistency: bool,
    /// Warn about out-of-order timestamps (timestamps are trusted, not an error)
    pub warn_out_of_order_timestamps: bool,
    /// Warn about content blocks this version does not know
    pub warn_unknown_blocks: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_stats_consistency: true,
            warn_out_of_order_timestamps: true,
            warn_unknown_blocks: true,
        }
    }
}

/// Validation result.
#[derive(Debug)]
pub struct ValidationResult {
    /// Hard errors that make the export invalid
    pub errors: Vec<ValidationError>,
    /// Warnings that don't make the export invalid
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a transcript export.
pub fn validate(export: &TranscriptExport, options: &ValidationOptions) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let loglines = export.loglines();

    if loglines.is_empty() {
        errors.push(ValidationError::NoLoglines);
    }

    if options.check_stats_consistency && export.stats.emitted_loglines != loglines.len() {
        errors.push(ValidationError::EmittedCountMismatch {
            recorded: export.stats.emitted_loglines,
            actual: loglines.len(),
        });
    }

    let mut last_ts = None;

    for (index, logline) in loglines.iter().enumerate() {
        if !logline.has_content() {
            errors.push(ValidationError::EmptyContent { index });
        }

        if logline.message.role != logline.kind {
            errors.push(ValidationError::RoleMismatch {
                index,
                kind: logline.kind.as_str().to_string(),
                role: logline.message.role.as_str().to_string(),
            });
        }

        if options.warn_unknown_blocks
            && logline
                .content_blocks()
                .iter()
                .any(|b| matches!(b, ContentBlock::Unknown))
        {
            warnings.push(format!("Logline {} contains an unknown block type", index));
        }

        if options.warn_out_of_order_timestamps {
            if let Some(ts) = parse_timestamp(&logline.timestamp) {
                if let Some(last) = last_ts {
                    if ts < last {
                        warnings.push(format!(
                            "Logline {} has timestamp {} which is before the previous logline's",
                            index, logline.timestamp
                        ));
                    }
                }
                last_ts = Some(ts);
            }
        }
    }

    ValidationResult { errors, warnings }
}

/// Validate a transcript export with default options.
pub fn validate_default(export: &TranscriptExport) -> ValidationResult {
    validate(export, &ValidationOptions::default())
}
