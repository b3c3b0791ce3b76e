//! API route modules.

pub mod meetings;
pub mod telegram;
pub mod webhook;
