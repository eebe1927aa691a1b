//! Query Operators - series transformation primitives
//!
//! Both operators take a slice of points and return a new vector; neither
//! mutates its input nor fails. Missing values flow through as the NaN
//! sentinel.
//!
//! - [`fix`] regularizes fetched points onto the native interval grid
//! - [`consolidate`] reduces a regular series by a fixed factor

pub mod consolidate;
pub mod fix;

pub use consolidate::consolidate;
pub use fix::{fix, slot_count};
