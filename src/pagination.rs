// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination helpers for Kubernetes API list operations.
//!
//! The inventory scan must hand the reconciliation core a complete snapshot, so every
//! list call follows `continue` tokens to the last page before returning.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use crate::retry::retry_api_call;
use anyhow::Result;
use kube::{api::ListParams, Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// List all resources with automatic pagination.
///
/// Each page request is retried on transient API errors.
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client, api::ListParams};
/// use k8s_openapi::api::core::v1::Namespace;
/// use ednsctl::pagination::list_all_paginated;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<Namespace> = Api::all(client);
///
/// let namespaces = list_all_paginated(&api, ListParams::default()).await?;
/// println!("Found {} namespaces", namespaces.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if a page cannot be fetched after retries.
pub async fn list_all_paginated<K>(api: &Api<K>, mut list_params: ListParams) -> Result<Vec<K>>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let resource = K::plural(&()).to_string();
    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let params = list_params.clone();
        let result = retry_api_call(
            || {
                let params = params.clone();
                async move { api.list(&params).await }
            },
            &format!("list {resource}"),
        )
        .await?;

        let item_count = result.items.len();
        all_items.extend(result.items);

        debug!(
            resource = %resource,
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page from Kubernetes API"
        );

        match result.metadata.continue_ {
            Some(token) if !token.is_empty() => list_params.continue_token = Some(token),
            _ => break,
        }
    }

    Ok(all_items)
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
