//! Sensitive-data detection for outgoing chat content.
//!
//! One [`PatternSet`] is compiled at startup and shared read-only, through a
//! single [`PiiGate`], by every surface that screens text: the `/api/ai`
//! middleware and the client pre-check route.
//!
//! # Known false positives
//!
//! The bank-account matcher accepts any run of 9 to 12 ASCII digits, so phone
//! numbers, order ids and long amounts without separators are blocked too.

pub mod gate;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub use gate::{GateError, GateLimits, MalformedReason, PiiGate};

/// Category of personal data a pattern looks for. Declaration order is scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    PaymentCard,
    BankAccount,
    TaxId,
    EmailAddress,
}

impl PiiCategory {
    pub const ALL: [PiiCategory; 4] = [
        PiiCategory::PaymentCard,
        PiiCategory::BankAccount,
        PiiCategory::TaxId,
        PiiCategory::EmailAddress,
    ];

    /// Stable label used in logs and error bodies
    pub fn label(&self) -> &'static str {
        match self {
            PiiCategory::PaymentCard => "payment_card",
            PiiCategory::BankAccount => "bank_account",
            PiiCategory::TaxId => "tax_id",
            PiiCategory::EmailAddress => "email_address",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            // 3-4 groups of four digits, each optionally followed by '-' or whitespace
            PiiCategory::PaymentCard => r"(?:[0-9]{4}[-\s]?){3,4}",
            PiiCategory::BankAccount => r"[0-9]{9,12}",
            PiiCategory::TaxId => r"[A-Z]{2,3}[0-9]{6,10}",
            PiiCategory::EmailAddress => r"[A-Za-z0-9._%+-]+@",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern for {category}: {source}")]
    InvalidRegex {
        category: PiiCategory,
        #[source]
        source: regex::Error,
    },

    #[error("pattern set is empty")]
    EmptySet,
}

/// A compiled matcher tagged with the category it detects
#[derive(Clone)]
pub struct SensitivePattern {
    pub category: PiiCategory,
    regex: Regex,
}

impl SensitivePattern {
    pub fn compile(category: PiiCategory) -> Result<Self, PatternError> {
        let regex = Regex::new(category.pattern())
            .map_err(|source| PatternError::InvalidRegex { category, source })?;
        Ok(Self { category, regex })
    }

    /// Stateless test; `Regex` keeps no match position between calls.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Debug for SensitivePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensitivePattern")
            .field("category", &self.category)
            .field("pattern", &self.as_str())
            .finish()
    }
}

/// Immutable, ordered set of sensitive-data matchers.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<SensitivePattern>,
}

impl PatternSet {
    /// Compile the four standard categories in scan order
    pub fn standard() -> Result<Self, PatternError> {
        let patterns = PiiCategory::ALL
            .iter()
            .map(|category| SensitivePattern::compile(*category))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[SensitivePattern] {
        &self.patterns
    }

    /// First category whose pattern matches anywhere in `text`
    pub fn scan(&self, text: &str) -> Option<PiiCategory> {
        self.patterns
            .iter()
            .find(|pattern| pattern.is_match(text))
            .map(|pattern| pattern.category)
    }
}

static STANDARD_PATTERNS: Lazy<Result<PatternSet, PatternError>> = Lazy::new(PatternSet::standard);

/// Process-wide standard pattern set, compiled on first use
pub fn standard_patterns() -> Result<&'static PatternSet, &'static PatternError> {
    Lazy::force(&STANDARD_PATTERNS).as_ref()
}
