pub mod amount;
pub mod identity;
pub mod models;
