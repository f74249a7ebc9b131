//! Batch Input Module
//!
//! Turns raw tabular batch text into ordered job rows.

mod models;
mod parser;

pub use models::*;
pub use parser::*;
