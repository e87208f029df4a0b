//! In-memory network for controller tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use reqwest::{StatusCode, header};
use rutas_core::{Error, RequestIdentity};

use crate::fetch::{FetchResponse, Network};

/// Serves canned bodies by URL; unknown URLs answer 404. Can be switched
/// offline, and individual URLs can be made to fail at the transport level.
#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    broken: Mutex<Vec<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serve(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.as_bytes().to_vec()));
    }

    pub(crate) fn break_url(&self, url: &str) {
        self.broken.lock().unwrap().push(url.to_string());
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, identity: &RequestIdentity) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        if self.broken.lock().unwrap().iter().any(|u| u == identity.url()) {
            return Err(Error::Network(format!("connection reset: {}", identity.url())));
        }

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(identity.url())
            .cloned()
            .unwrap_or((404, b"not found".to_vec()));

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        Ok(FetchResponse { status: StatusCode::from_u16(status).unwrap(), headers, bytes: Bytes::from(body) })
    }
}
