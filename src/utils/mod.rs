// src/utils/mod.rs
pub mod candle;
pub mod config;
pub mod env;
