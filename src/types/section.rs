//! Resolved section and signature types
//!
//! The hand-off types between the resolution phase and the composer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a section's content was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Substituted,
    Generated,
    GeneratedFallback,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substituted => "substituted",
            Self::Generated => "generated",
            Self::GeneratedFallback => "generated_fallback",
        }
    }
}

impl std::fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage attributed to one generated section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionUsage {
    pub tokens: u32,
}

/// One section's final content, ready for layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSection {
    pub section_key: String,
    pub title: String,
    /// Markup in the composer's safe subset
    pub content: String,
    pub resolution_kind: ResolutionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<SectionUsage>,
}

impl ResolvedSection {
    pub fn substituted(
        section_key: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            section_key: section_key.into(),
            title: title.into(),
            content: content.into(),
            resolution_kind: ResolutionKind::Substituted,
            usage: None,
        }
    }
}

/// Per-section entry of the resolution trace returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionTrace {
    pub section_key: String,
    pub resolution_kind: ResolutionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
    /// Why generation fell back, when it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// What stands in for a handwritten signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMark {
    /// Typed mark, e.g. initials or "Signed electronically"
    Mark(String),
    /// Reference to a stored signature image
    Image(String),
}

/// One signer in the signature grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub signer_name: String,
    pub role: String,
    pub image_or_mark: SignatureMark,
    #[serde(default)]
    pub signed_at: Option<NaiveDate>,
}

impl SignatureEntry {
    pub fn new(signer_name: impl Into<String>, role: impl Into<String>) -> Self {
        let signer_name = signer_name.into();
        Self {
            image_or_mark: SignatureMark::Mark(signer_name.clone()),
            signer_name,
            role: role.into(),
            signed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_kind_wire_names() {
        let json = serde_json::to_string(&ResolutionKind::GeneratedFallback).unwrap();
        assert_eq!(json, "\"generated_fallback\"");
        assert_eq!(ResolutionKind::Substituted.to_string(), "substituted");
    }

    #[test]
    fn test_signature_yaml() {
        let yaml = "- signer_name: Ana Ruiz\n  role: Resident engineer\n  image_or_mark:\n    mark: AR\n  signed_at: 2025-01-16\n";
        let entries: Vec<SignatureEntry> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entries[0].image_or_mark, SignatureMark::Mark("AR".into()));
        assert_eq!(
            entries[0].signed_at,
            NaiveDate::from_ymd_opt(2025, 1, 16)
        );
    }
}
