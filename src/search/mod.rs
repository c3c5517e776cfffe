pub mod bm25;
pub mod fusion;
pub mod hybrid;
pub mod vector;
