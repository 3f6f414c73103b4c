//! WordprocessingML to HTML content translation.
//!
//! Same rule-table walk as the ODF translator, over the `w:` vocabulary of
//! `word/document.xml`. Formatting properties are not mapped yet; runs and
//! block structure come through, property elements are dropped, and unknown
//! elements pass their children through with a warning.

use crate::common::xml::{XmlElement, XmlNode};
use crate::translate::{escape_html, TranslationContext};
use log::warn;
use phf::phf_map;
use std::fmt::Write as _;

enum ElementRule {
    /// Skip the element and its subtree.
    Drop,
    /// Emit children only, no tag of our own.
    Children,
    /// Rename to an HTML tag.
    Tag(&'static str),
    /// Hand-written translation.
    Custom(fn(&XmlElement, &mut TranslationContext)),
}

static ELEMENT_RULES: phf::Map<&'static str, ElementRule> = phf_map! {
    // Structure
    "w:body" => ElementRule::Children,
    "w:r" => ElementRule::Children,
    "w:t" => ElementRule::Children,
    "w:hyperlink" => ElementRule::Children,

    // Property and bookkeeping elements
    "w:pPr" => ElementRule::Drop,
    "w:rPr" => ElementRule::Drop,
    "w:sectPr" => ElementRule::Drop,
    "w:tblPr" => ElementRule::Drop,
    "w:tblGrid" => ElementRule::Drop,
    "w:trPr" => ElementRule::Drop,
    "w:tcPr" => ElementRule::Drop,
    "w:proofErr" => ElementRule::Drop,
    "w:bookmarkStart" => ElementRule::Drop,
    "w:bookmarkEnd" => ElementRule::Drop,

    // Renames
    "w:p" => ElementRule::Tag("p"),
    "w:br" => ElementRule::Tag("br"),
    "w:tbl" => ElementRule::Tag("table"),
    "w:tr" => ElementRule::Tag("tr"),
    "w:tc" => ElementRule::Tag("td"),

    "w:tab" => ElementRule::Custom(translate_tab),
};

/// Translate the body of a parsed `word/document.xml` root into the context.
pub fn translate_content(root: &XmlElement, ctx: &mut TranslationContext) {
    match root.child("w:body") {
        Some(body) => translate_element(body, ctx),
        None => warn!("document part has no w:body element"),
    }
}

fn translate_element(elem: &XmlElement, ctx: &mut TranslationContext) {
    match ELEMENT_RULES.get(elem.name.as_str()) {
        Some(ElementRule::Drop) => {}
        Some(ElementRule::Children) => translate_children(elem, ctx),
        Some(ElementRule::Tag(tag)) => {
            let _ = write!(ctx.output, "<{tag}>");
            translate_children(elem, ctx);
            let _ = write!(ctx.output, "</{tag}>");
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

fn translate_tab(_elem: &XmlElement, ctx: &mut TranslationContext) {
    ctx.write("\t");
}
