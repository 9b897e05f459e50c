//! Shared types for the Gemini document classifier

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ai::credentials;
use crate::config::ConfigError;

/// Placeholder the model uses (and we substitute) for a missing value
pub const NOT_AVAILABLE: &str = "N/A";

/// Document type classification
///
/// The set is closed: labels the model invents outside of it parse to
/// [`DocumentType::Unknown`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    ReceiptMemo,
    CementIssue,
    DieselIssue,
    GoodsReceivedNote,
    OilIssue,
    DeliveryChallan,
    Unknown,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        Self::ReceiptMemo,
        Self::CementIssue,
        Self::DieselIssue,
        Self::GoodsReceivedNote,
        Self::OilIssue,
        Self::DeliveryChallan,
        Self::Unknown,
    ];

    /// Human-readable label, as it appears in the prompt
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReceiptMemo => "Receipt Memo",
            Self::CementIssue => "Cement Issue",
            Self::DieselIssue => "Diesel Issue",
            Self::GoodsReceivedNote => "Goods Received Note",
            Self::OilIssue => "Oil Issue",
            Self::DeliveryChallan => "Delivery Challan",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a label returned by the model.
    ///
    /// Case, underscores and repeated whitespace are ignored.
    pub fn from_label(s: &str) -> Self {
        let normalized = s
            .replace('_', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match normalized.as_str() {
            "receipt memo" => Self::ReceiptMemo,
            "cement issue" => Self::CementIssue,
            "diesel issue" | "diesel receipt & issue" | "diesel receipt and issue" => {
                Self::DieselIssue
            }
            "goods received note" | "grn" => Self::GoodsReceivedNote,
            "oil issue" => Self::OilIssue,
            "delivery challan" => Self::DeliveryChallan,
            _ => Self::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the classifier extracted from one document image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub document_type: DocumentType,

    /// Most prominent identification number, `"N/A"` when absent
    pub serial_number: String,

    /// Handwritten issuing site, `"N/A"` when absent
    pub site: String,
}

impl ClassificationResult {
    /// Why this result cannot be filed under a type folder, if it can't
    pub fn rejection_reason(&self) -> Option<&'static str> {
        if self.document_type.is_unknown() {
            Some("document type is Unknown")
        } else if self.serial_number == NOT_AVAILABLE {
            Some("serial number is N/A")
        } else {
            None
        }
    }

    pub fn is_confident(&self) -> bool {
        self.rejection_reason().is_none()
    }
}

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for the Generative Language API
    pub api_key: String,

    /// Base URL for API (default: https://generativelanguage.googleapis.com)
    pub base_url: String,

    /// Model to use (default: gemini-2.5-flash)
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

impl GeminiConfig {
    /// Build the configuration from the process environment.
    ///
    /// Fails when no API key is set; `GEMINI_MODEL` and `GEMINI_BASE_URL`
    /// override the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = credentials::api_key_from_env()?;
        let defaults = Self::default();

        Ok(Self {
            api_key,
            base_url: non_blank_var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            model: non_blank_var("GEMINI_MODEL").unwrap_or(defaults.model),
        })
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_known_types() {
        for doc_type in DocumentType::ALL {
            assert_eq!(DocumentType::from_label(doc_type.label()), doc_type);
        }
    }

    #[test]
    fn test_from_label_is_forgiving() {
        assert_eq!(DocumentType::from_label("receipt memo"), DocumentType::ReceiptMemo);
        assert_eq!(DocumentType::from_label("  Cement   Issue "), DocumentType::CementIssue);
        assert_eq!(DocumentType::from_label("goods_received_note"), DocumentType::GoodsReceivedNote);
        assert_eq!(
            DocumentType::from_label("Diesel Receipt & Issue"),
            DocumentType::DieselIssue
        );
    }

    #[test]
    fn test_from_label_outside_set_is_unknown() {
        assert_eq!(DocumentType::from_label("Invoice"), DocumentType::Unknown);
        assert_eq!(DocumentType::from_label(""), DocumentType::Unknown);
    }

    #[test]
    fn test_rejection_reason() {
        let mut result = ClassificationResult {
            document_type: DocumentType::ReceiptMemo,
            serial_number: "58653".to_string(),
            site: NOT_AVAILABLE.to_string(),
        };
        assert!(result.is_confident());

        result.serial_number = NOT_AVAILABLE.to_string();
        assert_eq!(result.rejection_reason(), Some("serial number is N/A"));

        result.serial_number = "1".to_string();
        result.document_type = DocumentType::Unknown;
        assert_eq!(result.rejection_reason(), Some("document type is Unknown"));
    }
}
