//! Render a policy map plus generated tokens into CSP directive text.

use std::collections::HashSet;

use super::directive::{Directive, PolicyMap};
use super::object::CspObject;

/// Build the list of directives (`"style-src 'sha256-…' 'self';"`) in the
/// fixed directive order.
///
/// A directive is skipped when it is disabled, or when nothing was generated
/// for it and its configured value is empty. Generated tokens come before the
/// configured value.
pub fn build_csp_directives(
    policies: &PolicyMap,
    disabled: &HashSet<Directive>,
    generated: &CspObject,
) -> Vec<String> {
    Directive::ALL
        .into_iter()
        .filter(|d| !disabled.contains(d))
        .filter_map(|d| {
            let tokens = generated.get(d);
            let default = policies.get(d);
            if tokens.is_empty() && default.is_empty() {
                return None;
            }
            let value = format!("{} {}", tokens.join(" "), default);
            Some(format!("{} {};", d.header_name(), value.trim()))
        })
        .collect()
}

/// The full header value: directives joined by single spaces.
pub fn build_csp_header(
    policies: &PolicyMap,
    disabled: &HashSet<Directive>,
    generated: &CspObject,
) -> String {
    build_csp_directives(policies, disabled, generated).join(" ")
}
