//! SQL query implementations.

pub mod items;
