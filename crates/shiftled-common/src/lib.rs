#![doc = "Common types shared across the shiftled workspace."]

pub mod config;
pub mod daytime;
pub mod error;
pub mod jitter;
pub mod report;
pub mod state;

pub use config::*;
pub use daytime::*;
pub use error::*;
pub use jitter::*;
pub use state::*;
