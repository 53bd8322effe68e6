#![forbid(unsafe_code)]

pub mod model;
pub mod quiz;
pub mod scoring;
pub mod time;
pub mod timer;

pub use time::Clock;
