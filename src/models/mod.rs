//! Data models for the inbound chat API and the upstream Gemini API.
//!
//! - `chat`: request/response bodies of `/api/chat`
//! - `gemini`: the subset of the Gemini `generateContent` REST schema we use

// Author: kelexine (https://github.com/kelexine)

pub mod chat;
pub mod gemini;

pub use chat::{ChatReply, ChatRequest, ChatResponse, ErrorBody};
pub use gemini::{GenerateContentRequest, GenerateContentResponse};
