pub mod config;
pub mod error;
pub mod logging;

pub mod control;
pub mod downloader;
pub mod job;
pub mod library;
pub mod metadata;
pub mod naming;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod source;
pub mod store;

pub use error::{Result, VdqError};
