//! Remote nutrition analysis and the failure taxonomy around it.
//!
//! - **client**: the collaborator trait and photo payload
//! - **anthropic**: concrete vision client over the Messages API
//! - **classify**: fault → [`ErrorKind`] mapping and user messages
//! - **retry**: [`ErrorKind`] + attempt → [`RetryDecision`]

pub(crate) mod anthropic;
pub(crate) mod classify;
pub(crate) mod client;
pub(crate) mod retry;

pub use anthropic::{resolve_env_var, AnthropicAnalyzer};
pub use classify::{classify, is_retryable, user_message, ErrorKind};
pub use client::{ExternalAnalysisClient, PhotoInput};
pub use retry::{RetryDecision, RetryPolicy, MAX_ATTEMPTS};
