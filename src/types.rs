//! Audit dimension types
//!
//! Form factors and Lighthouse categories as enums rather than strings, so
//! file names, CLI flags and table columns all come from one spelling.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Browsing context a Lighthouse run emulates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    Desktop,
    Mobile,
}

impl FormFactor {
    /// All form factors in audit and column order (desktop first)
    pub fn all() -> Vec<FormFactor> {
        Self::iter().collect()
    }

    /// Short title used in table headers
    pub fn title(&self) -> &'static str {
        match self {
            Self::Desktop => "Desktop",
            Self::Mobile => "Mobile",
        }
    }
}

/// Lighthouse scoring category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum Category {
    #[strum(serialize = "performance")]
    #[serde(rename = "performance")]
    Performance,
    #[strum(serialize = "accessibility")]
    #[serde(rename = "accessibility")]
    Accessibility,
    #[strum(serialize = "best-practices")]
    #[serde(rename = "best-practices")]
    BestPractices,
    #[strum(serialize = "seo")]
    #[serde(rename = "seo")]
    Seo,
}

impl Category {
    /// All categories in table column order
    pub fn all() -> Vec<Category> {
        Self::iter().collect()
    }

    /// Category id as it appears in Lighthouse's `categories` object
    pub fn id(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Accessibility => "accessibility",
            Self::BestPractices => "best-practices",
            Self::Seo => "seo",
        }
    }

    /// Abbreviation used in table headers
    pub fn short_label(&self) -> &'static str {
        match self {
            Self::Performance => "Perf",
            Self::Accessibility => "A11y",
            Self::BestPractices => "BP",
            Self::Seo => "SEO",
        }
    }

    /// Value for Lighthouse's `--only-categories` flag
    pub fn only_categories_flag() -> String {
        Self::iter()
            .map(|c| c.id())
            .collect::<Vec<_>>()
            .join(",")
    }
}
