//! Core data types: spot records, visualizable paths, and source enums.
//!
//! A [`Spot`] is built once while parsing an upstream response and is never
//! mutated afterwards; downstream code only filters, truncates, or joins it.

pub mod enums;
pub mod path;
pub mod spot;

pub use enums::*;
pub use path::*;
pub use spot::*;
