pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod feedback;
pub mod global;
pub mod monitor;
pub mod telegram;
pub mod transcription;
pub mod webhook;
