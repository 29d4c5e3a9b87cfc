pub mod executor;
pub mod node_query;
pub mod planner;
pub mod rewrite;

pub use executor::{DocMatch, NodeMatch, Searcher};
pub use node_query::{
    BooleanClause, BooleanQuery, FuzzyQuery, NodeQuery, Occur, QueryKind, RangeQuery, TwigClause,
    TwigQuery,
};
pub use planner::{CompiledPlan, PlanNode};
