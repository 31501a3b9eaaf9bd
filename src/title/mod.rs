//! Title normalization and lookup variant generation.
//!
//! - [`normalize`] - canonical comparable form (subtitle, parenthetical and article stripped)
//! - [`to_comparable_case`] - the label casing convention used for exact-label lookups
//! - [`variants`] - regional spelling variants of a case-converted title
//! - [`NormalizedTitle`] - canonical form plus the ordered lookup variants of one raw title

mod normalizer;
mod variants;

pub use normalizer::{collapse_whitespace, normalize, to_comparable_case};
pub use variants::{NormalizedTitle, REGIONAL_SPELLINGS, variants};
