pub mod catalog;
pub mod classifier;
pub mod recommendation;
pub mod serving;
pub mod snapshot;
pub mod storage;
