//! AWS integration module.
//!
//! This module provides the SQS control-plane interface used to read and
//! create queues, its `aws-sdk-sqs` implementation, and the direct-apply
//! render target.

mod api;
mod client;
mod target;

#[cfg(test)]
pub use api::MockQueueApi;
pub use api::{QueueApi, QueueAttribute, MAX_LIST_RESULTS};
pub use client::SqsClient;
pub use target::AwsApiTarget;
