pub mod client;
pub mod indexes;
pub mod models;
