//! These models represent the objects passed around by the agent
//!
//! There are two formats we need to interact with:
//! - openai-compatible chat messages/tools, sent from the agent to the LLM
//! - tool calls, sent from the agent to the systems providing capabilities
//!
//! We always immediately convert wire data into the internal structs using
//! to/from helpers in `providers::utils`, so nothing outside the provider
//! depends on the shape of the remote API.
pub mod content;
pub mod conversation;
pub mod message;
pub mod outcome;
pub mod role;
pub mod tool;
