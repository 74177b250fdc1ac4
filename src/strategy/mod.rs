pub mod policy;
pub mod selection;
