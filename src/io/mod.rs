pub mod demand;
pub mod report;
