// Reward source retrieval and per-source aggregation
pub mod extractor;
pub mod graphql;
pub mod models;

pub use extractor::{Aggregation, RewardExtractor, SourceLedger};
pub use graphql::{GraphQlSource, RewardSource};
