pub mod bucket;
pub mod change;
