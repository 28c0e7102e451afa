pub mod projector;
pub mod tabular;

pub use projector::AirdropRow;
pub use tabular::{read_rows, write_rows};
