//! Style resolution and CSS emission for ODF documents.
//!
//! Walks `office:styles` and `office:automatic-styles`, emits one CSS class
//! per style, and records each style's ancestor chain (parent style, then
//! family) in the context's [`StyleDependencyMap`] so the content translator
//! can expand style references into class lists.
//!
//! Known formatting attributes are mapped through a static substitution
//! table; everything else is dropped silently. Underline and line-through
//! both map to `text-decoration`, so whichever is written last overrides the
//! other. This matches long-standing renderer behavior and is left as is.

use crate::common::xml::XmlElement;
use crate::translate::{escape_style_name, TranslationContext};
use log::warn;
use phf::phf_map;
use std::fmt::Write as _;

/// Direct attribute to CSS property substitutions.
static PROPERTY_RULES: phf::Map<&'static str, &'static str> = phf_map! {
    "fo:text-align" => "text-align",
    "fo:font-size" => "font-size",
    "fo:font-weight" => "font-weight",
    "fo:font-style" => "font-style",
    "fo:color" => "color",
    "fo:background-color" => "background-color",
    "fo:page-width" => "width",
    "fo:page-height" => "height",
    "fo:margin" => "margin",
    "fo:margin-top" => "margin-top",
    "fo:margin-right" => "margin-right",
    "fo:margin-bottom" => "margin-bottom",
    "fo:margin-left" => "margin-left",
    "fo:padding" => "padding",
    "fo:padding-top" => "padding-top",
    "fo:padding-right" => "padding-right",
    "fo:padding-bottom" => "padding-bottom",
    "fo:padding-left" => "padding-left",
    "fo:border" => "border",
    "fo:border-top" => "border-top",
    "fo:border-right" => "border-right",
    "fo:border-bottom" => "border-bottom",
    "fo:border-left" => "border-left",
    "fo:text-indent" => "text-indent",
    "fo:line-height" => "line-height",
    "style:font-name" => "font-family",
    "style:column-width" => "width",
    "style:row-height" => "height",
    "style:width" => "width",
    "style:vertical-align" => "vertical-align",
};

/// Translate the style sections directly under `root` (the root element of
/// `styles.xml` or `content.xml`), writing CSS into the context and filling
/// its dependency map.
pub fn translate_styles(root: &XmlElement, ctx: &mut TranslationContext) {
    for section in root.elements() {
        if section.name == "office:styles" || section.name == "office:automatic-styles" {
            for style in section.elements() {
                translate_style(style, ctx);
            }
        }
    }
}

fn translate_style(style: &XmlElement, ctx: &mut TranslationContext) {
    match style.name.as_str() {
        "style:default-style" => {
            // Default styles are keyed by their family.
            let Some(family) = style.attribute("style:family") else {
                warn!("skipped default style without family attribute");
                return;
            };
            emit_class(&escape_style_name(family), style, ctx);
        }
        "style:style" => {
            let Some(raw_name) = style.attribute("style:name") else {
                warn!("skipped style without name attribute");
                return;
            };
            let name = escape_style_name(raw_name);

            let mut ancestors = Vec::new();
            if let Some(parent) = style.attribute("style:parent-style-name") {
                ancestors.push(escape_style_name(parent));
            }
            if let Some(family) = style.attribute("style:family") {
                ancestors.push(escape_style_name(family));
            }

            emit_class(&name, style, ctx);
            ctx.styles.insert(name, ancestors);
        }
        // Font faces, page layouts and list styles carry no class output.
        _ => {}
    }
}

/// Emit `.name.name { ... }` with the style's mapped properties.
///
/// The doubled class selector outranks the single-class selectors of
/// inherited ancestors without resorting to `!important`.
fn emit_class(name: &str, style: &XmlElement, ctx: &mut TranslationContext) {
    let _ = write!(ctx.output, ".{name}.{name} {{");
    for properties in style
        .elements()
        .filter(|e| e.name.ends_with("-properties"))
    {
        for (attr, value) in &properties.attributes {
            translate_property(attr, value, ctx);
        }
    }
    ctx.write("}\n");
}

fn translate_property(attr: &str, value: &str, ctx: &mut TranslationContext) {
    if let Some(css) = PROPERTY_RULES.get(attr) {
        let _ = write!(ctx.output, "{css}:{value};");
        return;
    }
    match attr {
        "style:text-underline-style" => {
            if value == "solid" {
                ctx.write("text-decoration:underline;");
            }
        }
        "style:text-line-through-style" => {
            if value == "solid" {
                ctx.write("text-decoration:line-through;");
            }
        }
        _ => {}
    }
}
