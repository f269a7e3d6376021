//! Per-session dashboard state.
//!
//! A [`SessionContext`] is the single owner of everything a signed-in user
//! has derived: the record store they are looking at, the current filter and
//! its view, and the page cursor. Contexts live in a [`SessionStore`] held by
//! the application state and are looked up by the session cookie.

use crate::error::Result;
use crate::filter::{self, FilterConfig};
use crate::login::Principal;
use crate::pagination::{Page, PageCursor, page_count, paginate};
use crate::store::{RecordStore, View};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Where the session's record store came from
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum DataSource {
    /// The spreadsheet configured at startup
    File(String),
    /// A spreadsheet uploaded during this session
    Upload(String),
    /// The persisted employees table
    Database,
    None,
}

#[derive(Debug)]
pub struct SessionContext {
    pub principal: Principal,
    pub expires_at: DateTime<Utc>,
    store: RecordStore,
    source: DataSource,
    filter: FilterConfig,
    view: View,
    cursor: PageCursor,
    page_size: usize,
}

impl SessionContext {
    pub fn new(
        principal: Principal,
        store: RecordStore,
        source: DataSource,
        page_size: usize,
        expires_at: DateTime<Utc>,
    ) -> Self {
        SessionContext {
            principal,
            expires_at,
            view: store.full_view(),
            store,
            source,
            filter: FilterConfig::default(),
            cursor: PageCursor::default(),
            page_size,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.cursor.current()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.view.len(), self.page_size)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Derive a new view from `config`. On error the previous filter and
    /// view stay in place.
    pub fn apply_filter(&mut self, config: FilterConfig) -> Result<&View> {
        let view = filter::apply(&self.store, &config)?;
        debug!("Filter kept {} of {} rows", view.len(), self.store.len());
        self.view = view;
        self.filter = config;
        let pages = self.page_count();
        self.cursor.clamp(pages);
        Ok(&self.view)
    }

    /// Drop the filter and show every row again
    pub fn reset_filter(&mut self) {
        self.filter = FilterConfig::default();
        self.view = self.store.full_view();
        self.cursor.reset();
    }

    /// Switch to another record store; the filter is reset
    pub fn set_store(&mut self, store: RecordStore, source: DataSource) {
        self.store = store;
        self.source = source;
        self.reset_filter();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        let pages = self.page_count();
        self.cursor.clamp(pages);
    }

    /// The current page of the current view
    pub fn page(&mut self) -> Result<Page> {
        paginate(&self.view, self.page_size, &mut self.cursor)
    }

    pub fn jump(&mut self, page: usize) -> Result<Page> {
        let pages = self.page_count();
        self.cursor.jump(page, pages)?;
        self.page()
    }

    pub fn next_page(&mut self) -> Result<Page> {
        let pages = self.page_count();
        self.cursor.next(pages);
        self.page()
    }

    pub fn prev_page(&mut self) -> Result<Page> {
        self.cursor.prev();
        self.page()
    }
}

/// Live sessions keyed by cookie value
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionContext>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore::default()
    }

    /// Register a context and return its new session id
    pub async fn insert(&self, context: SessionContext) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.lock().await.insert(id.clone(), context);
        id
    }

    /// Principal of a live session; expired sessions are dropped on sight
    pub async fn principal(&self, id: &str) -> Option<Principal> {
        let mut sessions = self.sessions.lock().await;
        if sessions.get(id)?.is_expired(Utc::now()) {
            sessions.remove(id);
            return None;
        }
        sessions.get(id).map(|ctx| ctx.principal.clone())
    }

    /// Run `f` against a live session
    pub async fn with<R>(&self, id: &str, f: impl FnOnce(&mut SessionContext) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock().await;
        let ctx = sessions.get_mut(id).filter(|ctx| !ctx.is_expired(Utc::now()))?;
        Some(f(ctx))
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    /// End every session of `login_id`
    pub async fn remove_user(&self, login_id: &str) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, ctx| ctx.principal.login_id != login_id);
        before - sessions.len()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, ctx| !ctx.is_expired(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Expiry instant for a session opened now
pub fn expiry_after(hours: u32) -> DateTime<Utc> {
    Utc::now() + Duration::hours(i64::from(hours))
}
