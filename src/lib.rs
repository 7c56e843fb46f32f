// gemini-chat - Caching chat gateway in front of the Google Gemini API
// Author: kelexine (https://github.com/kelexine)

pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gemini;
pub mod metrics;
pub mod models;
pub mod server;
pub mod utils;
