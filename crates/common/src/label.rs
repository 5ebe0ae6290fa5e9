use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Microscopy modality assigned to a sub-image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationLabel {
    /// Not an image of interest (rejected by the binary gate)
    #[serde(rename = "None")]
    None,
    #[serde(rename = "CTEM")]
    Ctem,
    #[serde(rename = "Diffraction")]
    Diffraction,
    #[serde(rename = "HR-TEM")]
    HrTem,
    #[serde(rename = "SEM")]
    Sem,
    #[serde(rename = "STEM")]
    Stem,
}

/// Output ordering of the five-way classifier
pub const FINE_GRAINED_LABELS: [ClassificationLabel; 5] = [
    ClassificationLabel::Ctem,
    ClassificationLabel::Diffraction,
    ClassificationLabel::HrTem,
    ClassificationLabel::Sem,
    ClassificationLabel::Stem,
];

impl ClassificationLabel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationLabel::None => "None",
            ClassificationLabel::Ctem => "CTEM",
            ClassificationLabel::Diffraction => "Diffraction",
            ClassificationLabel::HrTem => "HR-TEM",
            ClassificationLabel::Sem => "SEM",
            ClassificationLabel::Stem => "STEM",
        }
    }

    /// Label for an index of the five-way classifier output
    #[must_use]
    pub fn from_fine_grained_index(index: usize) -> Option<Self> {
        FINE_GRAINED_LABELS.get(index).copied()
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, ClassificationLabel::None)
    }
}

impl std::fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        std::iter::once(ClassificationLabel::None)
            .chain(FINE_GRAINED_LABELS)
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown classification label: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fine_grained_ordering() {
        assert_eq!(
            ClassificationLabel::from_fine_grained_index(0),
            Some(ClassificationLabel::Ctem)
        );
        assert_eq!(
            ClassificationLabel::from_fine_grained_index(2),
            Some(ClassificationLabel::HrTem)
        );
        assert_eq!(
            ClassificationLabel::from_fine_grained_index(4),
            Some(ClassificationLabel::Stem)
        );
        assert_eq!(ClassificationLabel::from_fine_grained_index(5), None);
    }

    #[test]
    fn test_label_display_and_parse() {
        assert_eq!(ClassificationLabel::HrTem.to_string(), "HR-TEM");
        assert_eq!(ClassificationLabel::None.to_string(), "None");
        assert_eq!(
            "Diffraction".parse::<ClassificationLabel>(),
            Ok(ClassificationLabel::Diffraction)
        );
        assert!("hr-tem".parse::<ClassificationLabel>().is_err());
    }

    #[test]
    fn test_label_serde_names() {
        let json = serde_json::to_string(&ClassificationLabel::HrTem).unwrap();
        assert_eq!(json, "\"HR-TEM\"");
        let parsed: ClassificationLabel = serde_json::from_str("\"STEM\"").unwrap();
        assert_eq!(parsed, ClassificationLabel::Stem);
    }
}
