//! Minimal document model over `lol_html`: select elements, read inner
//! content or attributes, set attributes, serialize.
//!
//! Every operation is one streaming pass over the current markup. Mutating
//! passes replace the stored markup with the rewritten output; everything
//! else in the document is passed through byte for byte.
//!
//! The tokenizer runs with scripting enabled, so `<noscript>` content comes
//! through as raw text. It is handled as a nested document to match a
//! scripting-disabled DOM, where those elements are real.

use std::cell::{Cell, RefCell};

use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, Selector, element, rewrite_str, text};

use crate::error::{Error, Result};

/// Nonce stamped on every script and style bearing element.
///
/// The same value is used for every element of every page.
pub const NONCE: &str = "41SWRENqnTUAb6n3";

const NOSCRIPT: &str = "noscript";

/// Elements that receive the nonce attribute.
pub const NONCE_SELECTORS: [&str; 4] = ["script", r#"link[rel="stylesheet"]"#, "style", "[style]"];

pub struct Document {
    html: String,
}

impl Document {
    /// Malformed markup is accepted as is; the tokenizer recovers the same
    /// way a browser does.
    pub fn parse(raw: impl Into<String>) -> Self {
        Self { html: raw.into() }
    }

    /// Set `name="value"` on every element matching `selector`.
    /// Returns the number of elements touched.
    pub fn set_attribute(&mut self, selector: &str, name: &str, value: &str) -> Result<usize> {
        let selector = checked_selector(selector)?;
        let count = Cell::new(0);
        let mut noscript = String::new();
        let output = rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!(selector, |el| {
                        el.set_attribute(name, value)?;
                        count.set(count.get() + 1);
                        Ok(())
                    }),
                    text!(NOSCRIPT, |chunk| {
                        noscript.push_str(chunk.as_str());
                        if !chunk.last_in_text_node() {
                            chunk.remove();
                            return Ok(());
                        }
                        let mut inner = Document::parse(std::mem::take(&mut noscript));
                        count.set(count.get() + inner.set_attribute(selector, name, value)?);
                        chunk.replace(inner.serialize(), ContentType::Html);
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::new()
            },
        )
        .map_err(Error::markup)?;
        self.html = output;
        Ok(count.get())
    }

    /// Text content of every element matching `selector`, one entry per
    /// element in document order.
    pub fn inner_contents(&self, selector: &str) -> Result<Vec<String>> {
        let selector = checked_selector(selector)?;
        let contents = RefCell::new(Vec::<String>::new());
        let mut noscript = String::new();
        rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!(selector, |_el| {
                        contents.borrow_mut().push(String::new());
                        Ok(())
                    }),
                    text!(selector, |chunk| {
                        if let Some(last) = contents.borrow_mut().last_mut() {
                            last.push_str(chunk.as_str());
                        }
                        Ok(())
                    }),
                    text!(NOSCRIPT, |chunk| {
                        noscript.push_str(chunk.as_str());
                        if chunk.last_in_text_node() {
                            let inner = Document::parse(std::mem::take(&mut noscript));
                            contents.borrow_mut().extend(inner.inner_contents(selector)?);
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::new()
            },
        )
        .map_err(Error::markup)?;
        Ok(contents.into_inner())
    }

    /// Value of attribute `name` on every element matching `selector` that
    /// carries it, in document order. Character references are decoded, so
    /// the values are the ones a browser sees.
    pub fn attribute_values(&self, selector: &str, name: &str) -> Result<Vec<String>> {
        let selector = checked_selector(selector)?;
        let values = RefCell::new(Vec::new());
        let mut noscript = String::new();
        rewrite_str(
            &self.html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!(selector, |el| {
                        if let Some(value) = el.get_attribute(name) {
                            values
                                .borrow_mut()
                                .push(html_escape::decode_html_entities(&value).into_owned());
                        }
                        Ok(())
                    }),
                    text!(NOSCRIPT, |chunk| {
                        noscript.push_str(chunk.as_str());
                        if chunk.last_in_text_node() {
                            let inner = Document::parse(std::mem::take(&mut noscript));
                            values.borrow_mut().extend(inner.attribute_values(selector, name)?);
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::new()
            },
        )
        .map_err(Error::markup)?;
        Ok(values.into_inner())
    }

    pub fn serialize(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }
}

/// `element!`/`text!` panic on a bad selector, so validate it up front.
fn checked_selector(selector: &str) -> Result<&str> {
    selector
        .parse::<Selector>()
        .map_err(|e| Error::markup(format!("invalid selector {selector:?}: {e}")))?;
    Ok(selector)
}

/// Stamp the nonce on every element matching `selector`.
pub fn inject_nonce(document: &mut Document, selector: &str) -> Result<usize> {
    document.set_attribute(selector, "nonce", NONCE)
}
