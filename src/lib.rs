//! # arbor - node-addressed postings
//!
//! arbor indexes documents whose terms live inside an ordered tree (record,
//! field, sub-field, ...) and answers structural queries over it. Every term
//! occurrence is stored with its document, its position and the
//! [`NodePath`](index::NodePath) of the node holding it.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Node paths, the block codec and the segment writer/reader
//! - [`search`] - Node cursors: terms, phrases, boolean combinators, twigs and filters
//! - [`query`] - Query tree, rewrite, planning and the searcher
//! - [`utils`] - Varints, edit distance and `term@0.1` token notation
//!
//! ## Quick Start
//!
//! ```
//! use arbor::index::{IndexConfig, SegmentWriter};
//! use arbor::query::{BooleanQuery, NodeQuery, Searcher};
//! use arbor::utils::parse_tagged;
//!
//! let mut writer = SegmentWriter::new(IndexConfig::default())?;
//! writer.add_document(&parse_tagged("aaa@0.0 bbb@0.0 aaa@0.1 ccc@0.1")?)?;
//! writer.add_document(&parse_tagged("aaa@0.0 aaa@0.1 bbb@0.1")?)?;
//! let reader = writer.finish()?;
//!
//! let query: NodeQuery = BooleanQuery::new()
//!     .should(NodeQuery::term("bbb"))
//!     .must_not(NodeQuery::term("ccc"))
//!     .into();
//! let results = Searcher::new(&reader).search(&query, 10)?;
//! assert_eq!(results.len(), 2);
//! # Ok::<(), arbor::Error>(())
//! ```
//!
//! ## Execution model
//!
//! A query is rewritten once (constraint propagation, term expansion) into
//! an immutable [`CompiledPlan`](query::CompiledPlan). Each execution
//! instantiates its own cursor tree from the plan and pulls it document by
//! document, then node by node. Postings bytes are shared read-only between
//! executions, so independent searches can run on separate threads.

pub mod error;
pub mod index;
pub mod query;
pub mod search;
pub mod utils;

pub use error::{Error, Result};
