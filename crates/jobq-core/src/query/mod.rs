pub mod engine;
pub mod page;
pub mod predicate;
pub mod ranker;
