//! Utility functions shared across the crate.
//!
//! ## Modules
//!
//! - [`encoding`] - Variable-length integer encoding (varint)
//! - [`levenshtein`] - Bounded edit distance for fuzzy term expansion
//! - [`tokenizer`] - `term@0.1` token notation and node paths
//!
//! ## Key Functions
//!
//! ```
//! use arbor::utils::parse_tagged;
//!
//! // Two tokens in node [0, 0], one in node [0, 1]
//! let tokens = parse_tagged("aaa@0.0 bbb@0.0 aaa@0.1").unwrap();
//! assert_eq!(tokens[1].position, 1);
//! ```

pub mod encoding;
pub mod levenshtein;
pub mod tokenizer;

pub use encoding::*;
pub use levenshtein::*;
pub use tokenizer::*;
