//! HTTP client for the external communication-thread service.
//!
//! Negotiations and orders each get a chat thread in a separate service. This client covers the small slice of its
//! API the engine needs: create a thread, rename it, add a participant, and post a system message into it.
use std::sync::Arc;

use log::*;
use market_engine::db_types::OfferSession;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::config::ThreadServiceConfig;

#[derive(Debug, Error)]
pub enum ThreadApiError {
    #[error("Could not initialize the thread service client. {0}")]
    Initialization(String),
    #[error("Thread service request failed. {0}")]
    RequestError(String),
    #[error("Thread service returned {status}: {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not decode thread service response. {0}")]
    JsonError(String),
}

#[derive(Clone)]
pub struct ThreadApi {
    config: ThreadServiceConfig,
    client: Arc<Client>,
}

impl ThreadApi {
    pub fn new(config: ThreadServiceConfig) -> Result<Self, ThreadApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.as_str())
            .map_err(|e| ThreadApiError::Initialization(e.to_string()))?;
        headers.insert("X-Api-Key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ThreadApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, ThreadApiError> {
        let url = format!("{}{path}", self.config.base_url);
        trace!("Sending thread service request: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ThreadApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("Thread service request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ThreadApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ThreadApiError::RequestError(e.to_string()))?;
            Err(ThreadApiError::QueryError { status, message })
        }
    }

    /// Creates a thread for the negotiation and returns its identifier.
    pub async fn create_thread(&self, session: &OfferSession) -> Result<String, ThreadApiError> {
        #[derive(Deserialize)]
        struct ThreadResponse {
            thread_id: String,
        }
        let body = serde_json::json!({
            "title": format!("Offer negotiation with {}", session.customer_name),
            "participants": {
                "customer_id": session.customer_id,
                "contractor_id": session.contractor_id,
                "assigned_id": session.assigned_id,
            },
        });
        debug!("Creating thread for session {}", session.id);
        let result = self.rest_query::<ThreadResponse, _>(Method::POST, "/threads", Some(body)).await?;
        info!("Created thread {} for session {}", result.thread_id, session.id);
        Ok(result.thread_id)
    }

    pub async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<(), ThreadApiError> {
        let body = serde_json::json!({ "title": title });
        let path = format!("/threads/{thread_id}");
        debug!("Renaming thread {thread_id} to '{title}'");
        self.rest_query::<serde_json::Value, _>(Method::PATCH, &path, Some(body)).await?;
        Ok(())
    }

    /// Adds a user to an existing thread so they can follow and discuss the work.
    pub async fn assign_to_thread(&self, thread_id: &str, user_id: i64) -> Result<(), ThreadApiError> {
        let body = serde_json::json!({ "user_id": user_id });
        let path = format!("/threads/{thread_id}/participants");
        debug!("Adding user {user_id} to thread {thread_id}");
        self.rest_query::<serde_json::Value, _>(Method::POST, &path, Some(body)).await?;
        Ok(())
    }

    pub async fn post_system_message(&self, thread_id: &str, message: &str) -> Result<(), ThreadApiError> {
        let body = serde_json::json!({ "kind": "system", "body": message });
        let path = format!("/threads/{thread_id}/messages");
        debug!("Posting system message to thread {thread_id}");
        self.rest_query::<serde_json::Value, _>(Method::POST, &path, Some(body)).await?;
        Ok(())
    }
}
