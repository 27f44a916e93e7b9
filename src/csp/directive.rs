//! The fixed set of CSP directives and the policy defaults merger.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A CSP directive this tool knows how to render.
///
/// Variant order is the rendering order of the header, so `Ord` is derived
/// from it and [`Directive::ALL`] lists the variants in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Directive {
    DefaultSrc,
    ChildSrc,
    ConnectSrc,
    FontSrc,
    FrameSrc,
    ImgSrc,
    ManifestSrc,
    MediaSrc,
    ObjectSrc,
    PrefetchSrc,
    ScriptSrc,
    ScriptSrcElem,
    ScriptSrcAttr,
    StyleSrc,
    StyleSrcElem,
    StyleSrcAttr,
    WorkerSrc,
    BaseUri,
    FormAction,
    FrameAncestors,
}

impl Directive {
    pub const ALL: [Directive; 20] = [
        Directive::DefaultSrc,
        Directive::ChildSrc,
        Directive::ConnectSrc,
        Directive::FontSrc,
        Directive::FrameSrc,
        Directive::ImgSrc,
        Directive::ManifestSrc,
        Directive::MediaSrc,
        Directive::ObjectSrc,
        Directive::PrefetchSrc,
        Directive::ScriptSrc,
        Directive::ScriptSrcElem,
        Directive::ScriptSrcAttr,
        Directive::StyleSrc,
        Directive::StyleSrcElem,
        Directive::StyleSrcAttr,
        Directive::WorkerSrc,
        Directive::BaseUri,
        Directive::FormAction,
        Directive::FrameAncestors,
    ];

    /// The camelCase key used in configuration files.
    pub fn key(self) -> &'static str {
        match self {
            Directive::DefaultSrc => "defaultSrc",
            Directive::ChildSrc => "childSrc",
            Directive::ConnectSrc => "connectSrc",
            Directive::FontSrc => "fontSrc",
            Directive::FrameSrc => "frameSrc",
            Directive::ImgSrc => "imgSrc",
            Directive::ManifestSrc => "manifestSrc",
            Directive::MediaSrc => "mediaSrc",
            Directive::ObjectSrc => "objectSrc",
            Directive::PrefetchSrc => "prefetchSrc",
            Directive::ScriptSrc => "scriptSrc",
            Directive::ScriptSrcElem => "scriptSrcElem",
            Directive::ScriptSrcAttr => "scriptSrcAttr",
            Directive::StyleSrc => "styleSrc",
            Directive::StyleSrcElem => "styleSrcElem",
            Directive::StyleSrcAttr => "styleSrcAttr",
            Directive::WorkerSrc => "workerSrc",
            Directive::BaseUri => "baseUri",
            Directive::FormAction => "formAction",
            Directive::FrameAncestors => "frameAncestors",
        }
    }

    /// The directive name as it appears in the header, e.g. `script-src-elem`.
    pub fn header_name(self) -> String {
        camel_case_to_kebab_case(self.key())
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_name())
    }
}

impl FromStr for Directive {
    type Err = String;

    /// Accepts either the config spelling (`styleSrc`) or the header
    /// spelling (`style-src`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Directive::ALL
            .into_iter()
            .find(|d| d.key() == s || d.header_name() == s)
            .ok_or_else(|| format!("unknown CSP directive: {s}"))
    }
}

/// Insert a hyphen between a lowercase letter or digit and a following
/// uppercase letter, then lowercase everything.
pub fn camel_case_to_kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if c.is_ascii_uppercase()
            && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
        prev = Some(c);
    }
    out
}

/// Default directive values merged with caller overrides.
///
/// Every known directive is present. Override keys that are not directives
/// are kept but never looked up by the serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyMap {
    values: HashMap<String, String>,
}

impl PolicyMap {
    /// The built-in defaults: every directive mapped to an empty value,
    /// meaning "not emitted unless something was generated for it".
    pub fn defaults() -> Self {
        let values = Directive::ALL
            .iter()
            .map(|d| (d.key().to_string(), String::new()))
            .collect();
        Self { values }
    }

    /// Overlay `overrides` on the built-in defaults.
    pub fn merge(overrides: &HashMap<String, String>) -> Self {
        Self::defaults().overlay(overrides)
    }

    /// A copy of this map with `overrides` replacing existing values.
    pub fn overlay(&self, overrides: &HashMap<String, String>) -> Self {
        let mut values = self.values.clone();
        for (key, value) in overrides {
            values.insert(key.clone(), value.clone());
        }
        Self { values }
    }

    /// The configured value for a directive (empty when unset).
    pub fn get(&self, directive: Directive) -> &str {
        self.values
            .get(directive.key())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn get_key(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for PolicyMap {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn kebab_case_transform() {
        assert_eq!(camel_case_to_kebab_case("scriptSrcElem"), "script-src-elem");
        assert_eq!(camel_case_to_kebab_case("defaultSrc"), "default-src");
        assert_eq!(camel_case_to_kebab_case("baseUri"), "base-uri");
        assert_eq!(camel_case_to_kebab_case("h2Title"), "h2-title");
        assert_eq!(camel_case_to_kebab_case("plain"), "plain");
        assert_eq!(camel_case_to_kebab_case("ABC"), "abc");
    }

    #[test]
    fn directive_from_either_spelling() {
        assert_eq!("styleSrc".parse::<Directive>(), Ok(Directive::StyleSrc));
        assert_eq!("style-src".parse::<Directive>(), Ok(Directive::StyleSrc));
        assert_eq!(
            "frame-ancestors".parse::<Directive>(),
            Ok(Directive::FrameAncestors)
        );
        let err = "style_src".parse::<Directive>().unwrap_err();
        assert!(err.contains("unknown CSP directive"), "got: {err}");
    }

    #[test]
    fn all_is_sorted_and_complete() {
        let mut sorted = Directive::ALL;
        sorted.sort();
        assert_eq!(sorted, Directive::ALL);
        assert_eq!(PolicyMap::defaults().len(), Directive::ALL.len());
    }

    #[test]
    fn merge_empty_returns_defaults() {
        let merged = PolicyMap::merge(&HashMap::new());
        assert_eq!(merged, PolicyMap::defaults());
        for d in Directive::ALL {
            assert_eq!(merged.get(d), "");
        }
    }

    #[test]
    fn merge_overrides_known_keys() {
        let merged = PolicyMap::merge(&overrides(&[
            ("objectSrc", "'none'"),
            ("defaultSrc", "'self'"),
        ]));
        assert_eq!(merged.get(Directive::ObjectSrc), "'none'");
        assert_eq!(merged.get(Directive::DefaultSrc), "'self'");
        assert_eq!(merged.get(Directive::ScriptSrc), "");
    }

    #[test]
    fn merge_is_idempotent() {
        let o = overrides(&[("imgSrc", "'self' data:")]);
        let once = PolicyMap::merge(&o);
        let twice = once.overlay(&o);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_carries_unknown_keys() {
        let merged = PolicyMap::merge(&overrides(&[("sandbox", "allow-forms")]));
        assert_eq!(merged.get_key("sandbox"), Some("allow-forms"));
        assert_eq!(merged.len(), Directive::ALL.len() + 1);
    }
}
