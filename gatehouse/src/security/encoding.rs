// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Output encoding for untrusted text.
//!
//! Every function here is total: any input has a safe output for its context.
//! The caller picks the context; there is deliberately no default.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingContext {
    HtmlBody,
    UrlParam,
    ScriptLiteral,
    CssValue,
}

pub fn encode(context: EncodingContext, input: &str) -> String {
    match context {
        EncodingContext::HtmlBody => escape_html(input),
        EncodingContext::UrlParam => encode_url_param(input),
        EncodingContext::ScriptLiteral => encode_script_literal(input),
        EncodingContext::CssValue => encode_css_value(input),
    }
}

/// Escapes the five HTML-significant characters. `&` goes first so entities
/// produced for the others are not escaped twice.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn encode_url_param(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// JSON string literal, additionally escaping characters that could end a
/// `<script>` element or a JS line.
pub fn encode_script_literal(input: &str) -> String {
    let json = serde_json::to_string(input).unwrap_or_else(|_| "\"\"".to_string());
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out
}

/// No CSS escaping primitive exists server-side, so anything outside
/// `[A-Za-z0-9_-]` is dropped.
pub fn encode_css_value(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

pub struct HtmlSanitizer {
    cleaner: ammonia::Builder<'static>,
}

impl HtmlSanitizer {
    /// Allow-list for user-authored rich text. Data attributes are never allowed.
    pub fn rich_text() -> Self {
        let mut cleaner = ammonia::Builder::empty();
        cleaner
            .add_tags(&[
                "b",
                "i",
                "em",
                "strong",
                "a",
                "p",
                "br",
                "ul",
                "ol",
                "li",
                "code",
                "pre",
                "blockquote",
            ])
            .add_tag_attributes("a", &["href"])
            .url_schemes(HashSet::from(["http", "https", "mailto"]))
            .link_rel(Some("noopener noreferrer"))
            .clean_content_tags(HashSet::from(["script", "style"]))
            .strip_comments(true);
        Self { cleaner }
    }

    /// Drops every tag, keeping escaped text only.
    pub fn text_only() -> Self {
        let mut cleaner = ammonia::Builder::empty();
        cleaner
            .clean_content_tags(HashSet::from(["script", "style"]))
            .strip_comments(true);
        Self { cleaner }
    }

    pub fn clean(&self, html: &str) -> String {
        self.cleaner.clean(html).to_string()
    }
}

static RICH_TEXT: Lazy<HtmlSanitizer> = Lazy::new(HtmlSanitizer::rich_text);
static TEXT_ONLY: Lazy<HtmlSanitizer> = Lazy::new(HtmlSanitizer::text_only);

pub fn sanitize_rich_html(input: &str) -> String {
    RICH_TEXT.clean(input)
}

pub fn strip_tags(input: &str) -> String {
    TEXT_ONLY.clean(input)
}

mod sealed {
    pub trait Sealed {}
}

/// Marker for an output context known at compile time.
pub trait OutputContext: sealed::Sealed {
    const CONTEXT: EncodingContext;
}

pub mod contexts {
    use super::{EncodingContext, OutputContext, sealed::Sealed};

    #[derive(Debug)]
    pub enum HtmlBody {}
    #[derive(Debug)]
    pub enum UrlParam {}
    #[derive(Debug)]
    pub enum ScriptLiteral {}
    #[derive(Debug)]
    pub enum CssValue {}

    impl Sealed for HtmlBody {}
    impl Sealed for UrlParam {}
    impl Sealed for ScriptLiteral {}
    impl Sealed for CssValue {}

    impl OutputContext for HtmlBody {
        const CONTEXT: EncodingContext = EncodingContext::HtmlBody;
    }
    impl OutputContext for UrlParam {
        const CONTEXT: EncodingContext = EncodingContext::UrlParam;
    }
    impl OutputContext for ScriptLiteral {
        const CONTEXT: EncodingContext = EncodingContext::ScriptLiteral;
    }
    impl OutputContext for CssValue {
        const CONTEXT: EncodingContext = EncodingContext::CssValue;
    }
}

/// Text already encoded for context `C`. An `Encoded<HtmlBody>` cannot be passed
/// where an `Encoded<ScriptLiteral>` is expected.
pub struct Encoded<C: OutputContext> {
    value: String,
    _context: PhantomData<C>,
}

impl<C: OutputContext> Encoded<C> {
    pub fn new(raw: &str) -> Self {
        Self {
            value: encode(C::CONTEXT, raw),
            _context: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<C: OutputContext> Clone for Encoded<C> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _context: PhantomData,
        }
    }
}

impl<C: OutputContext> fmt::Debug for Encoded<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Encoded")
            .field(&C::CONTEXT)
            .field(&self.value)
            .finish()
    }
}

impl<C: OutputContext> fmt::Display for Encoded<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
