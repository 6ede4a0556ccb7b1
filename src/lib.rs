//! Telegram front-end that generates code with an AI service and packages it
//! for hosting platforms.

pub mod bot;
pub mod classifier;
pub mod config;
pub mod deploy;
pub mod extract;
pub mod generation;
