//! XML to HTML content translation for ODF documents.
//!
//! A recursive walk over the `office:body` tree driven by a static rule
//! table: elements are dropped, renamed to an HTML tag, or handed to a
//! custom translator. Elements without a rule pass their children through
//! with a warning instead of failing, so unfamiliar markup degrades to its
//! text content. Text nodes are HTML-escaped on the way out.

use crate::common::xml::{XmlElement, XmlNode};
use crate::translate::{escape_html, escape_style_name, TranslationContext};
use log::{debug, warn};
use phf::phf_map;
use std::fmt::Write as _;

/// Upper bound for `text:s` run expansion.
const MAX_SPACE_COUNT: usize = 4096;

/// Attributes that reference a style by name, in lookup order.
const STYLE_ATTRIBUTES: [&str; 4] = [
    "text:style-name",
    "table:style-name",
    "draw:style-name",
    "presentation:style-name",
];

struct TagRule {
    tag: &'static str,
    /// Fixed attributes always emitted on the open tag.
    attrs: &'static [(&'static str, &'static str)],
}

enum ElementRule {
    /// Skip the element and its subtree.
    Drop,
    /// Emit children only, no tag of our own.
    Children,
    /// Rename to an HTML tag, carrying the resolved class list.
    Tag(&'static TagRule),
    /// Hand-written translation.
    Custom(fn(&XmlElement, &mut TranslationContext)),
}

static ELEMENT_RULES: phf::Map<&'static str, ElementRule> = phf_map! {
    // Structure
    "office:body" => ElementRule::Children,
    "office:text" => ElementRule::Children,
    "office:spreadsheet" => ElementRule::Children,
    "office:presentation" => ElementRule::Children,
    "text:section" => ElementRule::Children,

    // Invisible bookkeeping
    "office:forms" => ElementRule::Drop,
    "office:annotation" => ElementRule::Drop,
    "text:sequence-decls" => ElementRule::Drop,
    "text:tracked-changes" => ElementRule::Drop,
    "table:covered-table-cell" => ElementRule::Drop,
    "table:named-expressions" => ElementRule::Drop,
    "table:calculation-settings" => ElementRule::Drop,

    // Plain renames
    "text:p" => ElementRule::Tag(&TagRule { tag: "p", attrs: &[] }),
    "text:span" => ElementRule::Tag(&TagRule { tag: "span", attrs: &[] }),
    "text:line-break" => ElementRule::Tag(&TagRule { tag: "br", attrs: &[] }),
    "text:list" => ElementRule::Tag(&TagRule { tag: "ul", attrs: &[] }),
    "text:list-item" => ElementRule::Tag(&TagRule { tag: "li", attrs: &[] }),
    "table:table-row" => ElementRule::Tag(&TagRule { tag: "tr", attrs: &[] }),
    "draw:page" => ElementRule::Tag(&TagRule { tag: "div", attrs: &[] }),
    "draw:frame" => ElementRule::Tag(&TagRule { tag: "div", attrs: &[] }),
    "draw:text-box" => ElementRule::Tag(&TagRule { tag: "div", attrs: &[] }),
    "table:table" => ElementRule::Custom(translate_table),

    // Custom behavior
    "text:h" => ElementRule::Custom(translate_heading),
    "text:s" => ElementRule::Custom(translate_spaces),
    "text:tab" => ElementRule::Custom(translate_tab),
    "text:a" => ElementRule::Custom(translate_link),
    "text:bookmark" => ElementRule::Custom(translate_bookmark),
    "text:bookmark-start" => ElementRule::Custom(translate_bookmark),
    "text:bookmark-end" => ElementRule::Drop,
    "table:table-column" => ElementRule::Custom(translate_column),
    "table:table-cell" => ElementRule::Custom(translate_cell),
};

/// Translate the body of a parsed `content.xml` root into the context.
pub fn translate_content(root: &XmlElement, ctx: &mut TranslationContext) {
    match root.child("office:body") {
        Some(body) => translate_element(body, ctx),
        None => warn!("content has no office:body element"),
    }
}

fn translate_element(elem: &XmlElement, ctx: &mut TranslationContext) {
    match ELEMENT_RULES.get(elem.name.as_str()) {
        Some(ElementRule::Drop) => {}
        Some(ElementRule::Children) => translate_children(elem, ctx),
        Some(ElementRule::Tag(rule)) => {
            open_tag(ctx, rule.tag, elem, rule.attrs);
            translate_children(elem, ctx);
            let _ = write!(ctx.output, "</{}>", rule.tag);
        }
        Some(ElementRule::Custom(f)) => f(elem, ctx),
        None => {
            warn!("no translation rule for {}, passing children through", elem.name);
            translate_children(elem, ctx);
        }
    }
}

fn translate_children(elem: &XmlElement, ctx: &mut TranslationContext) {
    for node in &elem.children {
        match node {
            XmlNode::Text(text) => ctx.write(&escape_html(text)),
            XmlNode::Element(child) => translate_element(child, ctx),
        }
    }
}

/// Emit `<tag class="..." fixed...>`, resolving the element's style
/// reference into a class list.
fn open_tag(
    ctx: &mut TranslationContext,
    tag: &str,
    elem: &XmlElement,
    fixed: &[(&str, &str)],
) {
    let class = class_attribute(elem, ctx);
    let _ = write!(ctx.output, "<{tag}");
    if let Some(class) = class {
        let _ = write!(ctx.output, " class=\"{}\"", escape_html(&class));
    }
    for (key, value) in fixed {
        let _ = write!(ctx.output, " {key}=\"{value}\"");
    }
    ctx.write(">");
}

/// Resolve the element's style-name attribute into a class list, if any.
fn class_attribute(elem: &XmlElement, ctx: &TranslationContext) -> Option<String> {
    let raw = STYLE_ATTRIBUTES
        .iter()
        .find_map(|attr| elem.attribute(attr))?;
    let name = escape_style_name(raw);
    match ctx.styles.class_list(&name) {
        Some(classes) => Some(classes),
        None => {
            warn!("unknown style reference: {raw}");
            None
        }
    }
}

fn translate_heading(elem: &XmlElement, ctx: &mut TranslationContext) {
    let level = elem
        .attribute("text:outline-level")
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(1)
        .clamp(1, 6);
    let tag = format!("h{level}");
    open_tag(ctx, &tag, elem, &[]);
    translate_children(elem, ctx);
    let _ = write!(ctx.output, "</{tag}>");
}

fn translate_spaces(elem: &XmlElement, ctx: &mut TranslationContext) {
    // Malformed or negative counts fall back to a single space.
    let count = elem
        .attribute("text:c")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .min(MAX_SPACE_COUNT);
    for _ in 0..count {
        ctx.write(" ");
    }
}

fn translate_tab(_elem: &XmlElement, ctx: &mut TranslationContext) {
    ctx.write("\t");
}

fn translate_link(elem: &XmlElement, ctx: &mut TranslationContext) {
    ctx.write("<a");
    match elem.attribute("xlink:href") {
        Some(href) => {
            let _ = write!(ctx.output, " href=\"{}\"", escape_html(href));
            // Fragment targets resolve against the bookmark anchors
            // emitted below.
            if href.starts_with('#') {
                ctx.write(" target=\"_self\"");
            }
        }
        None => warn!("hyperlink without target"),
    }
    ctx.write(">");
    translate_children(elem, ctx);
    ctx.write("</a>");
}

fn translate_bookmark(elem: &XmlElement, ctx: &mut TranslationContext) {
    match elem.attribute("text:name") {
        Some(name) => {
            let _ = write!(ctx.output, "<a id=\"{}\"></a>", escape_html(name));
        }
        None => {
            warn!("bookmark without name");
            ctx.write("<a></a>");
        }
    }
}

fn translate_table(elem: &XmlElement, ctx: &mut TranslationContext) {
    // Each sheet counts against the configured entry window.
    let selected = ctx.entry_selected();
    ctx.current_entry += 1;
    if !selected {
        return;
    }
    open_tag(ctx, "table", elem, &[("cellspacing", "0"), ("cellpadding", "0")]);
    translate_children(elem, ctx);
    ctx.write("</table>");
}

fn translate_column(elem: &XmlElement, ctx: &mut TranslationContext) {
    if let Some(repeated) = elem.attribute("table:number-columns-repeated") {
        debug!("column repeat count {repeated} not expanded");
    }
    open_tag(ctx, "col", elem, &[]);
}

fn translate_cell(elem: &XmlElement, ctx: &mut TranslationContext) {
    let mut spans: Vec<(&str, &str)> = Vec::new();
    if let Some(cols) = elem.attribute("table:number-columns-spanned") {
        spans.push(("colspan", cols));
    }
    if let Some(rows) = elem.attribute("table:number-rows-spanned") {
        spans.push(("rowspan", rows));
    }
    if let Some(repeated) = elem.attribute("table:number-columns-repeated") {
        debug!("cell repeat count {repeated} not expanded");
    }
    open_tag(ctx, "td", elem, &spans);
    translate_children(elem, ctx);
    ctx.write("</td>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::parse_document;
    use crate::translate::HtmlConfig;

    fn translate(xml: &str) -> String {
        translate_with(xml, HtmlConfig::default()).output
    }

    fn translate_with(xml: &str, config: HtmlConfig) -> TranslationContext {
        let root = parse_document(xml.as_bytes()).unwrap();
        let mut ctx = TranslationContext::new(config);
        ctx.styles.insert("P1".to_string(), vec!["Standard".to_string()]);
        translate_content(&root, &mut ctx);
        ctx
    }

    #[test]
    fn test_paragraph_with_class_and_escaped_text() {
        let html = translate(
            r#"<office:document-content><office:body><office:text>
              <text:p text:style-name="P1">a &lt; b</text:p>
            </office:text></office:body></office:document-content>"#,
        );
        assert!(html.contains(r#"<p class="Standard P1">a &lt; b</p>"#));
    }

    #[test]
    fn test_unknown_style_reference_drops_class() {
        let html = translate(
            r#"<office:document-content><office:body><office:text>
              <text:p text:style-name="Nope">x</text:p>
            </office:text></office:body></office:document-content>"#,
        );
        assert!(html.contains("<p>x</p>"));
    }

    #[test]
    fn test_unknown_element_passes_children_through() {
        let html = translate(
            r#"<office:document-content><office:body><office:text>
              <text:p><text:ruby><text:ruby-base>kept</text:ruby-base></text:ruby></text:p>
            </office:text></office:body></office:document-content>"#,
        );
        assert!(html.contains("<p>kept</p>"));
    }

    #[test]
    fn test_heading_level_clamped() {
        let html = translate(
            r#"<office:document-content><office:body><office:text>
              <text:h text:outline-level="2">two</text:h>
              <text:h text:outline-level="9">nine</text:h>
              <text:h>default</text:h>
            </office:text></office:body></office:document-content>"#,
        );
        assert!(html.contains("<h2>two</h2>"));
        assert!(html.contains("<h6>nine</h6>"));
        assert!(html.contains("<h1>default</h1>"));
    }

    #[test]
    fn test_spaces_links_and_bookmarks() {
        let html = translate(
            r##"<office:document-content><office:body><office:text>
              <text:p><text:bookmark text:name="mark"/><text:s text:c="3"/><text:a xlink:href="#mark">go</text:a></text:p>
            </office:text></office:body></office:document-content>"##,
        );
        assert!(html.contains(r#"<a id="mark"></a>"#));
        assert!(html.contains(r##"</a>   <a href="#mark" target="_self">go</a>"##));
    }

    #[test]
    fn test_space_count_is_clamped() {
        let html = translate(
            r#"<office:document-content><office:body><office:text>
              <text:p><text:s text:c="999999999"/></text:p>
            </office:text></office:body></office:document-content>"#,
        );
        let p = html.split("<p>").nth(1).unwrap();
        assert!(p.starts_with(&" ".repeat(MAX_SPACE_COUNT)));
        assert!(!p.starts_with(&" ".repeat(MAX_SPACE_COUNT + 1)));
    }

    #[test]
    fn test_nameless_bookmark_and_bare_link_still_open_anchors() {
        let html = translate(
            r#"<office:document-content><office:body><office:text>
              <text:p><text:bookmark/><text:a>dangling</text:a></text:p>
            </office:text></office:body></office:document-content>"#,
        );
        assert!(html.contains("<p><a></a><a>dangling</a></p>"));
    }

    #[test]
    fn test_table_cells_with_spans() {
        let html = translate(
            r#"<office:document-content><office:body><office:spreadsheet>
              <table:table table:name="Sheet1">
                <table:table-column table:number-columns-repeated="2"/>
                <table:table-row>
                  <table:table-cell table:number-columns-spanned="2" table:number-rows-spanned="3">
                    <text:p>wide</text:p>
                  </table:table-cell>
                  <table:covered-table-cell/>
                </table:table-row>
              </table:table>
            </office:spreadsheet></office:body></office:document-content>"#,
        );
        assert!(html.contains(r#"<td colspan="2" rowspan="3">"#));
        assert!(html.contains("<tr>"));
        assert!(!html.contains("covered"));
    }

    #[test]
    fn test_sheet_entry_window() {
        let sheets = r#"<office:document-content><office:body><office:spreadsheet>
          <table:table table:name="A"><table:table-row><table:table-cell><text:p>first</text:p></table:table-cell></table:table-row></table:table>
          <table:table table:name="B"><table:table-row><table:table-cell><text:p>second</text:p></table:table-cell></table:table-row></table:table>
        </office:spreadsheet></office:body></office:document-content>"#;

        let all = translate_with(sheets, HtmlConfig::default());
        assert!(all.output.contains("first") && all.output.contains("second"));

        let second_only = translate_with(
            sheets,
            HtmlConfig {
                entry_offset: 1,
                entry_count: 1,
                editable: false,
            },
        );
        assert!(!second_only.output.contains("first"));
        assert!(second_only.output.contains("second"));
    }
}
