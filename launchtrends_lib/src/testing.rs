//! Scripted collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use producthunt_api::types::Post;
use tokio_util::sync::CancellationToken;

use crate::fetch::{FetchError, PageSource, PostPage};
use crate::governor::Sleeper;
use crate::window::QueryWindow;

/// Records requested sleeps without waiting.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    pub slept: Arc<Mutex<Vec<Duration>>>,
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// Serves pre-scripted responses per window, in order.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Result<PostPage, FetchError>>>>,
    pub calls: Mutex<Vec<(String, Option<String>, i64)>>,
    pub reauths: Mutex<u32>,
    pub reauth_result: Mutex<Option<FetchError>>,
    /// When set, re-authentication cancels this token and never completes.
    pub cancel_during_reauth: Mutex<Option<CancellationToken>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, window: &str, response: Result<PostPage, FetchError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(window.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PageSource for ScriptedSource {
    async fn fetch_page(
        &self,
        window: &QueryWindow,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<PostPage, FetchError> {
        let key = window.to_string();
        self.calls
            .lock()
            .unwrap()
            .push((key.clone(), cursor.map(str::to_string), limit));
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Ok(PostPage::default()))
    }

    async fn reauthenticate(&self) -> Result<(), FetchError> {
        *self.reauths.lock().unwrap() += 1;
        let hang_on = self.cancel_during_reauth.lock().unwrap().clone();
        if let Some(token) = hang_on {
            token.cancel();
            std::future::pending::<()>().await;
        }
        match self.reauth_result.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A post with the given id, a product URL derived from it and a launch timestamp.
pub fn post(id: &str, created_at: &str) -> Post {
    Post {
        id: id.to_string(),
        name: Some(format!("Product {}", id)),
        tagline: Some(format!("Tagline {}", id)),
        url: Some(format!("https://www.producthunt.com/posts/p-{}", id)),
        votes_count: Some(10),
        comments_count: Some(1),
        created_at: Some(created_at.to_string()),
        ..Post::default()
    }
}

/// A page of `count` posts numbered from `first_id`.
pub fn page(first_id: usize, count: usize, created_at: &str, next: Option<&str>) -> PostPage {
    PostPage {
        items: (first_id..first_id + count)
            .map(|i| post(&i.to_string(), created_at))
            .collect(),
        next_cursor: next.map(str::to_string),
        total_count: None,
    }
}
