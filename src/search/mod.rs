//! Node cursors: term postings, boolean combinators and structural filters.

pub mod conjunction;
pub mod constant;
pub mod cursor;
pub mod disjunction;
pub mod filter;
pub mod phrase;
pub mod req_excl;
pub mod req_opt;
pub mod scorer;
pub mod term;
pub mod twig;

pub use conjunction::NodeConjunction;
pub use constant::ConstantScore;
pub use cursor::{BoxedCursor, EmptyCursor, NodeCursor, PositionCursor};
pub use disjunction::NodeDisjunction;
pub use filter::{AncestorProjection, NodeFilter};
pub use phrase::PhraseCursor;
pub use req_excl::ReqExcl;
pub use req_opt::ReqOpt;
pub use scorer::{DocScoreMode, Scorer, ScoringWeights};
pub use term::TermCursor;
pub use twig::TwigConjunction;
