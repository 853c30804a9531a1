// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Google Cloud DNS backend.
//!
//! Talks to the Cloud DNS v1 REST API directly with reqwest.
//!
//! # API Endpoints Used
//!
//! - `GET  {endpoint}/projects/{project}/managedZones` - list zones (paginated)
//! - `GET  {endpoint}/projects/{project}/managedZones/{zone}/rrsets?name=&type=A` - list record sets (paginated)
//! - `POST {endpoint}/projects/{project}/managedZones/{zone}/changes` - submit a change
//! - `GET  {endpoint}/projects/{project}/managedZones/{zone}/changes/{id}` - read a change
//!
//! Every request carries a bearer token from [`auth::TokenSource`]. Requests are
//! never retried here: failures surface as [`BackendError`]s.

pub mod auth;
pub mod types;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::backend::{AddressRecord, ChangeHandle, DnsBackend, ManagedZone, ZoneChange};
use crate::constants::RECORD_TYPE_A;
use crate::dns_errors::{BackendError, DnsError};

use auth::TokenSource;
use types::{
    ChangeRequest, ChangeResource, ErrorResponse, ManagedZonesPage, ResourceRecordSetsPage,
};

/// Cloud DNS implementation of [`DnsBackend`] for one project.
#[derive(Debug)]
pub struct CloudDnsClient {
    client: reqwest::Client,
    endpoint: Url,
    project: String,
    tokens: TokenSource,
}

impl CloudDnsClient {
    /// Create a client for `project`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidResponse`] if `endpoint` cannot carry a path
    /// (e.g. a `data:` URL).
    pub fn new(
        client: reqwest::Client,
        endpoint: Url,
        project: impl Into<String>,
        tokens: TokenSource,
    ) -> Result<Self, BackendError> {
        if endpoint.cannot_be_a_base() {
            return Err(BackendError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: "endpoint URL cannot carry a path".to_string(),
            });
        }
        Ok(Self {
            client,
            endpoint,
            project: project.into(),
            tokens,
        })
    }

    /// `{endpoint}/projects/{project}/managedZones/{segments...}`
    fn zones_url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["projects", self.project.as_str(), "managedZones"])
                .extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, DnsError> {
        let token = self.tokens.access_token().await?;
        let endpoint = url.to_string();

        let response = request
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, &e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .ok()
                .filter(|message| !message.is_empty())
                .unwrap_or(text);
            return Err(BackendError::UnexpectedHttpResponse {
                endpoint,
                status_code: status.as_u16(),
                reason,
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&endpoint, &e))?;
        serde_json::from_slice(&body).map_err(|e| {
            BackendError::InvalidResponse {
                endpoint,
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, DnsError> {
        self.send(self.client.get(url.clone()), &url).await
    }
}

fn transport_error(endpoint: &str, e: &reqwest::Error) -> DnsError {
    if e.is_timeout() {
        BackendError::HttpRequestTimeout {
            endpoint: endpoint.to_string(),
        }
        .into()
    } else {
        BackendError::HttpConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl DnsBackend for CloudDnsClient {
    fn account(&self) -> &str {
        &self.project
    }

    async fn list_zones(&self) -> Result<Vec<ManagedZone>, DnsError> {
        let mut zones = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.zones_url(&[]);
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let page: ManagedZonesPage = self.get(url).await?;
            zones.extend(page.managed_zones.into_iter().map(ManagedZone::from));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(project = %self.project, zones = zones.len(), "Listed managed zones");
        Ok(zones)
    }

    async fn list_records(&self, zone: &str, fqdn: &str) -> Result<Vec<AddressRecord>, DnsError> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.zones_url(&[zone, "rrsets"]);
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("name", fqdn)
                    .append_pair("type", RECORD_TYPE_A);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: ResourceRecordSetsPage = self.get(url).await?;
            records.extend(page.rrsets.into_iter().map(AddressRecord::from));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(records)
    }

    async fn submit_change(
        &self,
        zone: &str,
        change: &ZoneChange,
    ) -> Result<ChangeHandle, DnsError> {
        let url = self.zones_url(&[zone, "changes"]);
        let body = ChangeRequest::from(change);
        let request = self.client.post(url.clone()).json(&body);

        let created: ChangeResource = self.send(request, &url).await?;
        Ok(created.into())
    }

    async fn get_change(&self, zone: &str, change_id: &str) -> Result<ChangeHandle, DnsError> {
        let change: ChangeResource = self.get(self.zones_url(&[zone, "changes", change_id])).await?;
        Ok(change.into())
    }
}
