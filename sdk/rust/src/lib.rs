//! Typed client for a running API tester server.

mod client;
mod error;

pub use client::{ApiTesterClient, CaughtRequests, ProxyRequest, ProxyResponse, WebhookReply};
pub use error::SdkError;
