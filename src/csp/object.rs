//! Generated source tokens per directive for one header record.

use std::collections::BTreeMap;

use super::directive::Directive;

/// Directive -> ordered source tokens (`'sha256-…'`, `'nonce-…'`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CspObject {
    sources: BTreeMap<Directive, Vec<String>>,
}

impl CspObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tokens for a directive, replacing any existing ones.
    pub fn set(&mut self, directive: Directive, tokens: Vec<String>) {
        self.sources.insert(directive, tokens);
    }

    /// Tokens for a directive, empty when none were generated.
    pub fn get(&self, directive: Directive) -> &[String] {
        self.sources
            .get(&directive)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Key-wise concatenation: tokens of `self` first, then those of `other`.
    /// Duplicates across the two are kept.
    pub fn concat(&self, other: &CspObject) -> CspObject {
        let mut sources = self.sources.clone();
        for (directive, tokens) in &other.sources {
            sources
                .entry(*directive)
                .or_default()
                .extend(tokens.iter().cloned());
        }
        CspObject { sources }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_directive_is_empty() {
        let obj = CspObject::new();
        assert!(obj.get(Directive::StyleSrc).is_empty());
    }

    #[test]
    fn concat_keeps_order_and_duplicates() {
        let mut a = CspObject::new();
        a.set(Directive::ScriptSrc, vec![]);
        a.set(Directive::StyleSrc, tokens(&["H1", "H2"]));
        let mut b = CspObject::new();
        b.set(Directive::ScriptSrc, vec![]);
        b.set(Directive::StyleSrc, tokens(&["H2", "H3"]));

        let merged = a.concat(&b);
        assert_eq!(merged.get(Directive::StyleSrc), tokens(&["H1", "H2", "H2", "H3"]));
        assert!(merged.get(Directive::ScriptSrc).is_empty());
        // Inputs are untouched.
        assert_eq!(a.get(Directive::StyleSrc), tokens(&["H1", "H2"]));
    }

    #[test]
    fn concat_adds_directives_only_in_other() {
        let a = CspObject::new();
        let mut b = CspObject::new();
        b.set(Directive::ImgSrc, tokens(&["x"]));
        assert_eq!(a.concat(&b).get(Directive::ImgSrc), tokens(&["x"]));
    }
}
