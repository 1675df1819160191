pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod ranking;
pub mod recorder;
pub mod retry;
pub mod seed;
pub mod selector;
pub mod storage;

pub use error::{Result, SwoonError};
