//! In-process fetchers for driving the pagination controller

use async_trait::async_trait;
use catalog_harvest::{PageFetcher, PageRequest, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::fixtures::empty_page;

/// Serves scripted bodies per page, then falls back to a per-page default
///
/// Pages without a script or default return the empty page.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripted: Mutex<HashMap<u32, VecDeque<String>>>,
    defaults: HashMap<u32, String>,
    calls: Mutex<Vec<u32>>,
}

impl ScriptedFetcher {
    /// Serve `body` for `page` whenever no scripted response is queued
    pub fn page(mut self, page: u32, body: String) -> Self {
        self.defaults.insert(page, body);
        self
    }

    /// Queue one-shot responses for `page`, served before its default
    pub fn queue(self, page: u32, bodies: Vec<String>) -> Self {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.entry(page).or_default().extend(bodies);
        }
        self
    }

    /// Pages requested so far, in order
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.page);
        }
        let queued = self
            .scripted
            .lock()
            .ok()
            .and_then(|mut s| s.get_mut(&request.page).and_then(VecDeque::pop_front));
        Ok(queued
            .or_else(|| self.defaults.get(&request.page).cloned())
            .unwrap_or_else(empty_page))
    }
}

/// Wraps a fetcher and cancels the run once a given page has been served
pub struct CancelAfter<F> {
    inner: F,
    page: u32,
    token: CancellationToken,
}

impl<F> CancelAfter<F> {
    pub fn new(inner: F, page: u32, token: CancellationToken) -> Self {
        Self { inner, page, token }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for CancelAfter<F> {
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<String> {
        let body = self.inner.fetch_page(request).await;
        if request.page == self.page {
            self.token.cancel();
        }
        body
    }
}
