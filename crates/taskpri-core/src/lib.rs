// taskpri-core: Types, traits, config, and errors for task-priority QP control.

pub mod cancel;
pub mod config;
pub mod constraint;
pub mod error;
pub mod level;
pub mod linear;
pub mod model;
pub mod task;
