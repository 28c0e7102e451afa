// Command batch encoding and round-trip verification
pub mod generator;
pub mod schema;
pub mod verifier;

pub use generator::generate_batch;
pub use schema::InvokeEntry;
pub use verifier::{compare, parse_batch, RoundTripReport};
