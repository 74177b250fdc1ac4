pub mod engine;
pub mod sweep;
