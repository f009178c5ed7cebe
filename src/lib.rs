// src/lib.rs

//! Untappd ratings core library

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{AppError, ErrorPayload, Result};
pub use services::RatingsService;
