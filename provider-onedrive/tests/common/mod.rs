//! Scripted request executor shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use tokio::time::Instant;

/// Answers requests from a queue of canned responses and records each
/// request together with the (virtual) time it was sent.
#[derive(Default)]
pub struct ScriptedHttpClient {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn respond_json(&self, status: u16, body: &str) -> &Self {
        self.respond(HttpResponse::new(status, body.to_string()))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn sent_at(&self) -> Vec<Instant> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((Instant::now(), request));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| BridgeError::OperationFailed("no scripted response left".to_string()))
    }
}

pub const ROOT_FOLDER: &str =
    r#"{"id":"root","name":"root","lastModifiedDateTime":"2024-01-01T00:00:00Z","folder":{"childCount":0}}"#;

pub fn folder(name: &str) -> String {
    format!(
        r#"{{"id":"{name}-id","name":"{name}","size":0,"lastModifiedDateTime":"2024-01-01T00:00:00Z","folder":{{"childCount":1}}}}"#
    )
}

pub fn file(name: &str, size: u64) -> String {
    format!(
        r#"{{"id":"{name}-id","name":"{name}","size":{size},"lastModifiedDateTime":"2024-01-01T00:00:00Z","file":{{"mimeType":"application/octet-stream"}},"@microsoft.graph.downloadUrl":"https://dl.example.com/{name}"}}"#
    )
}

pub fn page(items: &[String], next_link: Option<&str>) -> String {
    match next_link {
        Some(link) => format!(
            r#"{{"value":[{}],"@odata.nextLink":"{}"}}"#,
            items.join(","),
            link
        ),
        None => format!(r#"{{"value":[{}]}}"#, items.join(",")),
    }
}

pub fn upload_session(url: &str) -> String {
    format!(r#"{{"uploadUrl":"{url}","expirationDateTime":"2030-01-01T00:00:00Z"}}"#)
}
