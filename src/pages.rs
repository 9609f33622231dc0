//! Page registry shared by the audit and report phases.
//!
//! Both `lhaudit run` and `lhaudit report` walk the same `PageRegistry`, and
//! both derive result file names through [`result_file_name`]. Nothing else
//! links a result file to the page it belongs to.

use crate::error::{AuditError, Result};
use crate::types::FormFactor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Production site audited when no base URL is given
pub const DEFAULT_BASE_URL: &str = "https://www.northlight.studio";

/// A logical page of the site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Short slug used in result file names
    pub name: String,
    /// URL suffix appended to the base URL (empty for the root page)
    pub path: String,
    /// Display label for the report
    pub label: String,
}

impl PageEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            label: label.into(),
        }
    }

    /// Full URL of this page under `base`.
    ///
    /// A trailing `/` on the base is dropped so `https://site/` and
    /// `https://site` give the same URLs. The root page maps to the bare base.
    pub fn url(&self, base: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), self.path)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AuditError::registry("page name must not be empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AuditError::registry(format!(
                "page name '{}' may only contain letters, digits, '-' and '_'",
                self.name
            )));
        }
        if !self.path.is_empty() && !self.path.starts_with('/') {
            return Err(AuditError::registry(format!(
                "path '{}' of page '{}' must be empty or start with '/'",
                self.path, self.name
            )));
        }
        Ok(())
    }
}

/// Result file name for one (page, form factor) pair: `lh-<name>-<form_factor>.json`
pub fn result_file_name(page: &PageEntry, form_factor: FormFactor) -> String {
    format!("lh-{}-{}.json", page.name, form_factor)
}

/// Ordered, validated list of pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageRegistry {
    pages: Vec<PageEntry>,
}

impl PageRegistry {
    /// Build a registry, rejecting empty lists, invalid entries and duplicate names
    pub fn new(pages: Vec<PageEntry>) -> Result<Self> {
        if pages.is_empty() {
            return Err(AuditError::registry("at least one page is required"));
        }
        let mut seen = HashSet::new();
        for page in &pages {
            page.validate()?;
            if !seen.insert(page.name.as_str()) {
                return Err(AuditError::registry(format!(
                    "duplicate page name '{}'",
                    page.name
                )));
            }
        }
        Ok(Self { pages })
    }

    /// The site's compiled-in page list
    pub fn default_site() -> Self {
        let pages = [
            ("home", "", "Home"),
            ("services", "/services", "Services"),
            ("work", "/work", "Work"),
            ("case-studies", "/case-studies", "Case Studies"),
            ("about", "/about", "About"),
            ("products", "/products", "Products"),
            ("testimonials", "/testimonials", "Testimonials"),
            ("blog", "/blog", "Blog"),
            ("careers", "/careers", "Careers"),
            ("contact", "/contact", "Contact"),
            ("privacy", "/privacy", "Privacy Policy"),
        ]
        .into_iter()
        .map(|(name, path, label)| PageEntry::new(name, path, label))
        .collect();
        Self { pages }
    }

    /// Restrict to the named pages, keeping registry order.
    ///
    /// An empty filter returns the whole registry.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(AuditError::registry(format!("unknown page '{}'", unknown)));
        }
        let pages = self
            .pages
            .iter()
            .filter(|p| names.contains(&p.name))
            .cloned()
            .collect();
        Ok(Self { pages })
    }

    pub fn get(&self, name: &str) -> Option<&PageEntry> {
        self.pages.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageEntry> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Default for PageRegistry {
    fn default() -> Self {
        Self::default_site()
    }
}

impl<'de> Deserialize<'de> for PageRegistry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let pages = Vec::<PageEntry>::deserialize(deserializer)?;
        PageRegistry::new(pages).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a PageRegistry {
    type Item = &'a PageEntry;
    type IntoIter = std::slice::Iter<'a, PageEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_site_is_valid() {
        let registry = PageRegistry::default_site();
        assert_eq!(registry.len(), 11);
        assert!(PageRegistry::new(registry.iter().cloned().collect()).is_ok());
        assert_eq!(registry.iter().next().map(|p| p.name.as_str()), Some("home"));
    }

    #[test]
    fn test_root_page_url_has_no_suffix() {
        let home = PageEntry::new("home", "", "Home");
        assert_eq!(home.url("https://example.com"), "https://example.com");
        assert_eq!(home.url("https://example.com/"), "https://example.com");

        let about = PageEntry::new("about", "/about", "About");
        assert_eq!(about.url("https://example.com/"), "https://example.com/about");
    }

    #[test]
    fn test_result_file_name() {
        let page = PageEntry::new("case-studies", "/case-studies", "Case Studies");
        assert_eq!(
            result_file_name(&page, FormFactor::Desktop),
            "lh-case-studies-desktop.json"
        );
        assert_eq!(
            result_file_name(&page, FormFactor::Mobile),
            "lh-case-studies-mobile.json"
        );
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = PageRegistry::new(vec![
            PageEntry::new("home", "", "Home"),
            PageEntry::new("home", "/home", "Home again"),
        ]);
        assert!(matches!(result, Err(AuditError::Registry(_))));
    }

    #[test]
    fn test_registry_rejects_bad_entries() {
        assert!(PageRegistry::new(vec![]).is_err());
        assert!(PageRegistry::new(vec![PageEntry::new("", "", "Empty")]).is_err());
        assert!(PageRegistry::new(vec![PageEntry::new("a/b", "/a", "Slash")]).is_err());
        assert!(PageRegistry::new(vec![PageEntry::new("about", "about", "No slash")]).is_err());
    }

    #[test]
    fn test_select_keeps_registry_order() {
        let registry = PageRegistry::default_site();
        let selected = registry
            .select(&["contact".to_string(), "home".to_string()])
            .unwrap();
        let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["home", "contact"]);
    }

    #[test]
    fn test_select_unknown_page() {
        let registry = PageRegistry::default_site();
        assert!(registry.select(&["nope".to_string()]).is_err());
        assert_eq!(registry.select(&[]).unwrap().len(), registry.len());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: PageRegistry =
            serde_json::from_str(r#"[{"name":"home","path":"","label":"Home"}]"#).unwrap();
        assert_eq!(ok.len(), 1);

        let dup = serde_json::from_str::<PageRegistry>(
            r#"[{"name":"a","path":"","label":"A"},{"name":"a","path":"/a","label":"A"}]"#,
        );
        assert!(dup.is_err());
    }
}
