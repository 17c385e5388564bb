#![deny(clippy::all)]

pub mod container;
pub mod tracing;
