pub mod config;
pub mod error;
pub mod fit;
pub mod model;
pub mod ranking;
pub mod scoring;
pub mod source;
