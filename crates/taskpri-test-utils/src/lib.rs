//! Shared test fixtures: a scriptable mock model and canned tasks.

pub mod mocks;

pub use mocks::MockModel;
