//! Shared translation state and HTML output helpers.
//!
//! Both the style resolver and the content translator write into a
//! [`TranslationContext`], which owns the output buffer, the resolved style
//! dependency map, and the caller-supplied [`HtmlConfig`]. A context belongs
//! to exactly one translation pass; nothing here is shared between documents.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use std::collections::HashMap;

// Static initialization: automaton is built only once, thread-safe
static HTML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build HTML escaper")
});

/// Escape HTML special characters in text content and attribute values.
///
/// # Examples
///
/// ```
/// use pomelo::translate::escape_html;
/// assert_eq!(escape_html("a & b"), "a &amp; b");
/// assert_eq!(escape_html("<p>\"hi\"</p>"), "&lt;p&gt;&quot;hi&quot;&lt;/p&gt;");
/// ```
#[inline]
pub fn escape_html(s: &str) -> String {
    HTML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;", "&#39;"])
}

/// Rewrite an office style name into a CSS-safe identifier.
///
/// Office style names may contain `.`, which CSS class selectors cannot; the
/// same rewrite must be applied at definition and reference sites so the two
/// keep matching.
#[inline]
pub fn escape_style_name(name: &str) -> String {
    name.replace('.', "_")
}

/// Caller-facing translation options.
#[derive(Debug, Clone)]
pub struct HtmlConfig {
    /// First spreadsheet sheet to translate.
    pub entry_offset: usize,
    /// Number of sheets to translate; 0 means all remaining.
    pub entry_count: usize,
    /// Emit `contenteditable` on the body.
    pub editable: bool,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            entry_offset: 0,
            entry_count: 0,
            editable: false,
        }
    }
}

/// Escaped style name to its ordered ancestor chain (nearest parent first).
///
/// Built once by the style resolver, then read-only during content
/// translation.
#[derive(Debug, Default)]
pub struct StyleDependencyMap {
    deps: HashMap<String, Vec<String>>,
}

impl StyleDependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a style's ancestor chain under its escaped name.
    pub fn insert(&mut self, name: String, ancestors: Vec<String>) {
        self.deps.insert(name, ancestors);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deps.contains_key(name)
    }

    /// The `class` attribute value for a style reference: ancestors from the
    /// root of the chain down, then the style's own name.
    pub fn class_list(&self, name: &str) -> Option<String> {
        let ancestors = self.deps.get(name)?;
        let mut parts: Vec<&str> = ancestors.iter().rev().map(String::as_str).collect();
        parts.push(name);
        Some(parts.join(" "))
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}

/// Mutable state of one translation pass.
pub struct TranslationContext {
    pub config: HtmlConfig,
    pub styles: StyleDependencyMap,
    pub output: String,
    /// Index of the sheet currently being walked, for entry selection.
    pub current_entry: usize,
}

impl TranslationContext {
    pub fn new(config: HtmlConfig) -> Self {
        Self {
            config,
            styles: StyleDependencyMap::new(),
            output: String::new(),
            current_entry: 0,
        }
    }

    /// Whether the sheet at `current_entry` falls inside the configured
    /// offset/count window.
    pub fn entry_selected(&self) -> bool {
        if self.current_entry < self.config.entry_offset {
            return false;
        }
        if self.config.entry_count == 0 {
            return true;
        }
        self.current_entry < self.config.entry_offset + self.config.entry_count
    }

    pub fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }
}

/// Wrap translated CSS and body markup into a self-contained HTML page.
pub fn html_page(style: &str, body: &str, config: &HtmlConfig) -> String {
    let editable = if config.editable {
        " contenteditable=\"true\""
    } else {
        ""
    };
    format!(
        "<!DOCTYPE html>\n<html><head>\
         <meta charset=\"UTF-8\"/>\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0, user-scalable=yes\"/>\
         <style>{style}</style>\
         </head><body{editable}>{body}</body></html>"
    )
}
