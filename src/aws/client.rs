//! `aws-sdk-sqs` implementation of the queue provider interface.

use async_trait::async_trait;
use aws_sdk_sqs::error::ProvideErrorMetadata;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::error::ProviderError;

use super::api::{QueueApi, QueueAttribute};

/// Error codes SQS uses for a missing queue.
const QUEUE_NOT_FOUND_CODES: &[&str] = &[
    "QueueDoesNotExist",
    "AWS.SimpleQueueService.NonExistentQueue",
];

/// Error codes SQS uses for permission failures.
const ACCESS_DENIED_CODES: &[&str] = &["AccessDenied", "AccessDeniedException"];

/// SQS control-plane client.
#[derive(Debug, Clone)]
pub struct SqsClient {
    /// SDK client.
    client: Client,
}

impl SqsClient {
    /// Creates a client from the default AWS credential and region chain.
    pub async fn new(region: Option<&str>) -> Self {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Self::with_client(Client::new(&config))
    }

    /// Wraps an existing SDK client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Maps an SDK service error onto the provider error taxonomy.
fn classify<E>(operation: &str, queue_url: Option<&str>, err: &E) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let code = err.code().unwrap_or_default();
    let message = err
        .message()
        .map_or_else(|| err.to_string(), String::from);

    if let Some(url) = queue_url {
        if QUEUE_NOT_FOUND_CODES.contains(&code) {
            return ProviderError::QueueNotFound {
                queue_url: url.to_string(),
            };
        }
    }

    if ACCESS_DENIED_CODES.contains(&code) {
        return ProviderError::AccessDenied {
            operation: operation.to_string(),
            message,
        };
    }

    ProviderError::request(operation, message)
}

#[async_trait]
impl QueueApi for SqsClient {
    async fn list_queues(
        &self,
        name_prefix: &str,
        max_results: i32,
    ) -> Result<Vec<String>, ProviderError> {
        trace!("ListQueues prefix={name_prefix} max={max_results}");

        let output = self
            .client
            .list_queues()
            .queue_name_prefix(name_prefix)
            .max_results(max_results)
            .send()
            .await
            .map_err(|e| classify("ListQueues", None, &e.into_service_error()))?;

        let urls = output.queue_urls.unwrap_or_default();
        debug!("ListQueues({name_prefix}) returned {} queue(s)", urls.len());
        Ok(urls)
    }

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        attributes: &[QueueAttribute],
    ) -> Result<HashMap<String, String>, ProviderError> {
        trace!("GetQueueAttributes {queue_url}");

        let mut request = self.client.get_queue_attributes().queue_url(queue_url);
        for attribute in attributes {
            request = request.attribute_names(QueueAttributeName::from(attribute.as_str()));
        }

        let output = request.send().await.map_err(|e| {
            classify(
                "GetQueueAttributes",
                Some(queue_url),
                &e.into_service_error(),
            )
        })?;

        Ok(output
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_string(), value))
            .collect())
    }

    async fn list_queue_tags(
        &self,
        queue_url: &str,
    ) -> Result<Option<HashMap<String, String>>, ProviderError> {
        trace!("ListQueueTags {queue_url}");

        let output = self
            .client
            .list_queue_tags()
            .queue_url(queue_url)
            .send()
            .await
            .map_err(|e| classify("ListQueueTags", Some(queue_url), &e.into_service_error()))?;

        Ok(output.tags)
    }

    async fn create_queue(
        &self,
        name: &str,
        attributes: HashMap<String, String>,
        tags: Option<HashMap<String, String>>,
    ) -> Result<String, ProviderError> {
        let attributes: HashMap<QueueAttributeName, String> = attributes
            .into_iter()
            .map(|(key, value)| (QueueAttributeName::from(key.as_str()), value))
            .collect();

        let output = self
            .client
            .create_queue()
            .queue_name(name)
            .set_attributes(Some(attributes))
            .set_tags(tags)
            .send()
            .await
            .map_err(|e| classify("CreateQueue", None, &e.into_service_error()))?;

        output.queue_url.ok_or_else(|| {
            ProviderError::invalid_response("CreateQueue", format!("no queue URL returned for {name}"))
        })
    }
}
