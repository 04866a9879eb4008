pub mod bucketize;
pub mod extract;
pub mod generate;
