// src/lib.rs
pub mod api;
pub mod chat;
pub mod error;
pub mod features;
pub mod history;
pub mod models;
pub mod prediction;
pub mod utils;

pub use error::{AdvisorError, AdvisorResult};
