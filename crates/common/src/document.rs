//! Naming convention of acquired documents: `{source}_{year}_{sequence:04}.pdf`

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::ProcessingError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentName {
    pub source: String,
    pub year: u16,
    pub sequence: u32,
}

impl DocumentName {
    #[must_use]
    pub fn new(source: impl Into<String>, year: u16, sequence: u32) -> Self {
        Self {
            source: source.into(),
            year,
            sequence,
        }
    }

    /// File name without the `.pdf` extension, used as the source identifier
    #[must_use]
    pub fn stem(&self) -> String {
        format!("{}_{}_{:04}", self.source, self.year, self.sequence)
    }
}

impl std::fmt::Display for DocumentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.pdf", self.stem())
    }
}

impl FromStr for DocumentName {
    type Err = ProcessingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let invalid = || ProcessingError::InvalidDocumentName(name.to_string());

        let stem = name
            .strip_suffix(".pdf")
            .or_else(|| name.strip_suffix(".PDF"))
            .unwrap_or(name);

        // Source may itself contain underscores; year and sequence are the last two fields
        let mut fields = stem.rsplitn(3, '_');
        let sequence = fields.next().ok_or_else(invalid)?;
        let year = fields.next().ok_or_else(invalid)?;
        let source = fields.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;

        let digits = |field: &str| field.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || sequence.len() < 4 || !digits(year) || !digits(sequence) {
            return Err(invalid());
        }

        let parsed = Self {
            source: source.to_string(),
            year: year.parse().map_err(|_| invalid())?,
            sequence: sequence.parse().map_err(|_| invalid())?,
        };

        // Only the canonical spelling maps to a source id; extra zero padding would collide
        if parsed.stem() != stem {
            return Err(invalid());
        }
        Ok(parsed)
    }
}

/// Source identifier for a document path.
///
/// Conforming names map to their canonical stem; anything else falls back to
/// the file stem.
#[must_use]
pub fn source_id_for(path: &Path) -> String {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    match file_name.parse::<DocumentName>() {
        Ok(name) => name.stem(),
        Err(_) => path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string(),
    }
}
