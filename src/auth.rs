//! Token material handled by the broker.

pub mod secret;

pub use secret::*;
