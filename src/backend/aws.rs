//! # AWS Parameter Store Backend
//!
//! Client for reading from the AWS Systems Manager Parameter Store API.
//!
//! This module provides functionality to:
//! - Enumerate every parameter below a path (`DescribeParameters`, recursive)
//! - Retrieve single parameter values, decrypting `SecureString`s
//! - Map `StringList` parameters to [`ValueKind::List`]

use crate::backend::{ConfigBackend, RawParameter, ValueKind};
use crate::constants::{DEFAULT_PAGE_SIZE, SSM_BACKEND_LABEL};
use crate::observability::metrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_ssm::operation::get_parameter::GetParameterError;
use aws_sdk_ssm::types::{ParameterStringFilter, ParameterType};
use aws_sdk_ssm::Client as SsmClient;
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// AWS Parameter Store backend implementation
pub struct SsmBackend {
    client: SsmClient,
    page_size: i32,
}

impl std::fmt::Debug for SsmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsmBackend")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl SsmBackend {
    /// Create a new AWS Parameter Store backend
    /// Credentials come from the SDK default provider chain
    pub async fn new(region: Option<&str>, page_size: i32) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        match region {
            Some(region) => {
                info!("Using AWS region: {}", region);
                loader = loader.region(aws_config::Region::new(region.to_string()));
            }
            None => {
                info!("No region configured, using the AWS SDK default region provider chain");
            }
        }
        let sdk_config = loader.load().await;

        Self::from_client(SsmClient::new(&sdk_config)).with_page_size(page_size)
    }

    /// Wrap an already configured SSM client
    pub fn from_client(client: SsmClient) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the `DescribeParameters` page size (clamped to 1..=50)
    #[must_use]
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = clamp_page_size(page_size);
        self
    }
}

fn clamp_page_size(page_size: i32) -> i32 {
    page_size.clamp(1, DEFAULT_PAGE_SIZE)
}

/// Keep the SDK error as the source so its cause chain survives
fn backend_failure<E>(error: E, context: String) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    anyhow::Error::new(error).context(context)
}

fn value_kind(parameter_type: Option<&ParameterType>) -> ValueKind {
    match parameter_type {
        Some(ParameterType::StringList) => ValueKind::List,
        _ => ValueKind::Single,
    }
}

#[async_trait]
impl ConfigBackend for SsmBackend {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let span = tracing::debug_span!("aws.ssm.describe_parameters", path = prefix);
        let start = Instant::now();

        async move {
            let filter = ParameterStringFilter::builder()
                .key("Path")
                .option("Recursive")
                .values(prefix)
                .build()
                .context("Failed to build DescribeParameters path filter")?;

            let mut pages = self
                .client
                .describe_parameters()
                .parameter_filters(filter)
                .max_results(self.page_size)
                .into_paginator()
                .send();

            let mut keys = Vec::new();
            let mut page_count = 0usize;
            while let Some(page) = pages.next().await {
                let page = match page {
                    Ok(page) => page,
                    Err(e) => {
                        metrics::increment_backend_errors(SSM_BACKEND_LABEL, "list_keys");
                        return Err(backend_failure(
                            e,
                            format!("Failed to list AWS Parameter Store parameters under {prefix}"),
                        ));
                    }
                };
                page_count += 1;
                keys.extend(
                    page.parameters()
                        .iter()
                        .filter_map(|p| p.name().map(ToString::to_string)),
                );
            }

            debug!(
                "Listed {} parameters under {} in {} page(s)",
                keys.len(),
                prefix,
                page_count
            );
            metrics::record_backend_request(
                SSM_BACKEND_LABEL,
                "list_keys",
                start.elapsed().as_secs_f64(),
            );
            Ok(keys)
        }
        .instrument(span)
        .await
    }

    async fn get_value(&self, key: &str, decrypt: bool) -> Result<Option<RawParameter>> {
        let span = tracing::debug_span!("aws.ssm.get_parameter", parameter.name = key);
        let start = Instant::now();

        async move {
            match self
                .client
                .get_parameter()
                .name(key)
                .with_decryption(decrypt)
                .send()
                .await
            {
                Ok(response) => {
                    metrics::record_backend_request(
                        SSM_BACKEND_LABEL,
                        "get_value",
                        start.elapsed().as_secs_f64(),
                    );
                    Ok(response.parameter().and_then(|parameter| {
                        parameter.value().map(|value| RawParameter {
                            value: value.to_string(),
                            kind: value_kind(parameter.r#type()),
                        })
                    }))
                }
                Err(e) => {
                    if e
                        .as_service_error()
                        .is_some_and(GetParameterError::is_parameter_not_found)
                    {
                        debug!("AWS Parameter Store parameter {} not found", key);
                        metrics::record_backend_request(
                            SSM_BACKEND_LABEL,
                            "get_value",
                            start.elapsed().as_secs_f64(),
                        );
                        Ok(None)
                    } else {
                        metrics::increment_backend_errors(SSM_BACKEND_LABEL, "get_value");
                        Err(backend_failure(
                            e,
                            format!("Failed to get AWS Parameter Store parameter {key}"),
                        ))
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}
