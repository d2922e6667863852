//! Gateway construction and lifecycle.

mod builder;
mod controller;

pub use builder::{Fafnir, FafnirBuilder};
pub use controller::{Gateway, LifecycleState};
