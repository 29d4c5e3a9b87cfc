pub mod codec;
pub mod node_path;
pub mod reader;
pub mod stats;
pub mod types;
pub mod writer;

pub use node_path::{
    IntervalConstraint, LevelConstraint, NodeConstraints, NodePath, compare_ancestor,
};
pub use reader::SegmentReader;
pub use stats::SegmentStats;
pub use types::*;
pub use writer::SegmentWriter;
