//! Content Security Policy synthesis: directives, hashes and serialization.

mod directive;
mod hash;
mod object;
mod serialize;

pub use directive::{Directive, PolicyMap, camel_case_to_kebab_case};
pub use hash::{compute_hash, hash_values};
pub use object::CspObject;
pub use serialize::{build_csp_directives, build_csp_header};
