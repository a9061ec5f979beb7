pub mod drama;
pub mod fields;
