//! Configured calendar sources.

use serde::{Deserialize, Serialize};

/// One remote calendar feed, as declared in configuration.
///
/// Sources are immutable once loaded; the refresh cycle only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Unique key used in URLs and in the cache.
    pub id: String,
    /// Display label.
    pub name: String,
    /// Feed URL (`http`, `https` or `webcal`).
    pub url: String,
    /// Display color hint, passed through untouched.
    #[serde(default)]
    pub color: String,
    /// Whether the source takes part in refresh cycles.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Source {
    /// Creates an enabled source.
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            color: String::new(),
            enabled: true,
        }
    }

    /// Builder: set the display color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Builder: enable or disable the source.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// File name used when serving this source's calendar.
    ///
    /// Every character that is not an ASCII letter or digit becomes `_`.
    pub fn download_filename(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}.ics", stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_defaults_to_true() {
        let source: Source = serde_json::from_str(
            r#"{"id":"work","name":"Work","url":"https://example.com/work.ics"}"#,
        )
        .unwrap();
        assert!(source.enabled);
        assert_eq!(source.color, "");
    }

    #[test]
    fn explicit_disabled_is_kept() {
        let source: Source = serde_json::from_str(
            r##"{"id":"old","name":"Old","url":"https://example.com/old.ics","color":"#ff0000","enabled":false}"##,
        )
        .unwrap();
        assert!(!source.enabled);
        assert_eq!(source.color, "#ff0000");
    }

    #[test]
    fn builder_methods() {
        let source = Source::new("a", "A", "https://a.example/cal.ics")
            .with_color("#123456")
            .with_enabled(false);
        assert_eq!(source.color, "#123456");
        assert!(!source.enabled);
    }

    #[test]
    fn download_filename_replaces_non_alphanumerics() {
        let source = Source::new("fr", "Jours fériés (France)", "https://example.com/fr.ics");
        assert_eq!(source.download_filename(), "Jours_f_ri_s__France_.ics");
    }
}
