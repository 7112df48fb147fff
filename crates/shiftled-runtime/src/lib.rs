#![doc = "Signal loop runtime for shiftled."]

pub mod cancel;
pub mod pattern;
pub mod realtime;
pub mod scheduler;

pub use cancel::*;
pub use pattern::*;
pub use realtime::*;
pub use scheduler::*;
