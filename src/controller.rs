//! The record list controller shared by every administered collection.
//!
//! A controller owns one loaded collection and the user's [`ViewState`] over
//! it. Remote mutations always go to the server first; the local collection is
//! reconciled from the server's response only once the call has succeeded, so
//! a failed or aborted call leaves what the user sees untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::{ActionKind, ActionPhase, ActionTracker};
use crate::api_client::DEFAULT_TIMEOUT;
use crate::client::RecordBackend;
use crate::error::{ApiError, ControllerError};
use crate::record::Record;
use crate::status::{Clock, SystemClock};
use crate::view::{derive_view, total_pages, RecordView, SortSpec, ViewState};

/// A confirmed server-side change to fold into the local collection.
#[derive(Debug, Clone)]
pub enum Mutation<R> {
    Created(R),
    Updated(R),
    Deleted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient feedback after an action settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

pub struct RecordListController<R: Record, B: RecordBackend<R>> {
    backend: B,
    records: Vec<R>,
    view: ViewState,
    loading: bool,
    load_error: Option<String>,
    actions: ActionTracker,
    notification: Option<Notification>,
    lifetime: CancellationToken,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl<R: Record, B: RecordBackend<R>> std::fmt::Debug for RecordListController<R, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordListController")
            .field("collection", &R::COLLECTION)
            .field("records", &self.records.len())
            .field("view", &self.view)
            .field("loading", &self.loading)
            .field("load_error", &self.load_error)
            .field("unmounted", &self.lifetime.is_cancelled())
            .finish()
    }
}

impl<R: Record, B: RecordBackend<R>> RecordListController<R, B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            records: Vec::new(),
            view: ViewState::default(),
            loading: false,
            load_error: None,
            actions: ActionTracker::new(),
            notification: None,
            lifetime: CancellationToken::new(),
            timeout: DEFAULT_TIMEOUT,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_items_per_page(mut self, items_per_page: usize) -> Self {
        self.view.set_items_per_page(items_per_page);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Ties this controller to an outer lifetime, e.g. the screen showing it.
    pub fn with_lifetime(mut self, lifetime: CancellationToken) -> Self {
        self.lifetime = lifetime;
        self
    }

    // ===== ACCESSORS =====

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn action_phase(&self, id: &str) -> ActionPhase {
        self.actions.phase(id)
    }

    pub fn is_action_enabled(&self, id: &str) -> bool {
        self.actions.is_enabled(id)
    }

    /// Token cancelled when this controller is unmounted.
    pub fn lifetime(&self) -> CancellationToken {
        self.lifetime.clone()
    }

    /// Aborts in-flight calls; later calls fail with `Cancelled`.
    pub fn unmount(&self) {
        self.lifetime.cancel();
    }

    // ===== LOADING =====

    /// Replaces the local collection with the server's. On failure the
    /// collection is left empty and the error kept for display.
    pub async fn load(&mut self) -> Result<usize, ControllerError> {
        self.loading = true;
        self.load_error = None;
        let result = guarded(&self.lifetime, self.timeout, self.backend.list()).await;
        self.loading = false;

        match result {
            Ok(records) => {
                info!(collection = R::COLLECTION, count = records.len(), "loaded records");
                self.records = records;
                self.normalize_page();
                Ok(self.records.len())
            }
            Err(None) => Err(ControllerError::Cancelled),
            Err(Some(source)) => {
                warn!(collection = R::COLLECTION, error = %source, "failed to load records");
                self.records.clear();
                self.load_error = Some(format!("Could not load {}: {}", R::COLLECTION, source));
                Err(ControllerError::Fetch {
                    collection: R::COLLECTION,
                    source,
                })
            }
        }
    }

    // ===== VIEW =====

    /// Current page, after resetting an out-of-range page cursor to 1.
    pub fn view(&mut self) -> RecordView<'_, R> {
        self.normalize_page();
        derive_view(&self.records, &self.view, self.clock.today())
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.view.search_text = text.into();
        self.normalize_page();
    }

    pub fn set_filter(&mut self, field: impl Into<String>, value: Option<String>) {
        self.view.set_filter(field, value);
        self.normalize_page();
    }

    pub fn clear_filters(&mut self) {
        self.view.filters.clear();
        self.view.search_text.clear();
        self.normalize_page();
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.view.sort = sort;
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) {
        self.view.set_items_per_page(items_per_page);
        self.normalize_page();
    }

    pub fn set_page(&mut self, page: usize) {
        self.view.set_page(page);
        self.normalize_page();
    }

    pub fn next_page(&mut self) {
        let next = self.view.current_page() + 1;
        if next <= self.total_pages() {
            self.view.set_page(next);
        }
    }

    pub fn previous_page(&mut self) {
        let current = self.view.current_page();
        if current > 1 {
            self.view.set_page(current - 1);
        }
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered_count(), self.view.items_per_page())
    }

    fn filtered_count(&self) -> usize {
        let today = self.clock.today();
        self.records
            .iter()
            .filter(|r| crate::view::matches(*r, &self.view, today))
            .count()
    }

    fn normalize_page(&mut self) {
        let pages = self.total_pages();
        if self.view.clamp_page(pages) {
            debug!(collection = R::COLLECTION, pages, "page cursor reset to 1");
        }
    }

    // ===== RECONCILIATION =====

    /// Folds a server-confirmed change into the local collection. Updates
    /// and deletes for ids that are not loaded leave the collection as is.
    pub fn apply_remote_mutation(&mut self, mutation: Mutation<R>) {
        match mutation {
            Mutation::Created(record) => self.records.push(record),
            Mutation::Updated(record) => {
                let Some(id) = record.id().map(str::to_owned) else {
                    return;
                };
                if let Some(slot) = self.records.iter_mut().find(|r| r.id() == Some(id.as_str())) {
                    *slot = record;
                }
            }
            Mutation::Deleted(id) => {
                self.records.retain(|r| r.id() != Some(id.as_str()));
                self.normalize_page();
            }
        }
    }

    // ===== REMOTE ACTIONS =====

    /// Validates and creates a record, appending the server's copy. The page
    /// cursor does not move to show it.
    pub async fn create(&mut self, draft: R) -> Result<Notification, ControllerError> {
        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(ControllerError::Validation(errors));
        }

        let result = guarded(&self.lifetime, self.timeout, self.backend.create(&draft)).await;
        match result {
            Ok(created) if created.id().is_some() => {
                info!(collection = R::COLLECTION, id = created.id(), "created record");
                self.apply_remote_mutation(Mutation::Created(created));
                Ok(self.notify(Notification::success(format!("{} created", capitalize(R::LABEL)))))
            }
            Ok(_) => {
                let err = ControllerError::MissingIdentifier { label: R::LABEL };
                self.notify(Notification::error(err.to_string()));
                Err(err)
            }
            Err(None) => Err(ControllerError::Cancelled),
            Err(Some(source)) => Err(self.mutation_failed("create", source)),
        }
    }

    pub fn request_edit(&mut self, id: &str) -> Result<(), ControllerError> {
        self.actions.request(id, ActionKind::Edit)
    }

    pub fn request_delete(&mut self, id: &str) -> Result<(), ControllerError> {
        self.actions.request(id, ActionKind::Delete)
    }

    /// Dismisses a pending confirmation without contacting the server.
    pub fn cancel_action(&mut self, id: &str) -> bool {
        self.actions.cancel(id)
    }

    /// Sends a confirmed edit and replaces the local record with the
    /// server's copy.
    pub async fn confirm_edit(&mut self, id: &str, draft: R) -> Result<Notification, ControllerError> {
        let errors = draft.validate();
        if !errors.is_empty() {
            // Still awaiting confirmation; the form can be corrected.
            return Err(ControllerError::Validation(errors));
        }
        self.actions.confirm(id, ActionKind::Edit)?;

        let result = guarded(&self.lifetime, self.timeout, self.backend.update(id, &draft)).await;
        self.actions.settle(id);

        match result {
            Ok(mut updated) => {
                if updated.id().is_none() {
                    // Some APIs omit the id in update responses.
                    updated = with_id_of(updated, id);
                }
                info!(collection = R::COLLECTION, id, "updated record");
                self.apply_remote_mutation(Mutation::Updated(updated));
                Ok(self.notify(Notification::success(format!("{} updated", capitalize(R::LABEL)))))
            }
            Err(None) => Err(ControllerError::Cancelled),
            Err(Some(source)) => Err(self.mutation_failed(ActionKind::Edit.verb(), source)),
        }
    }

    /// Sends a confirmed delete and removes the local record only once the
    /// server has accepted it.
    pub async fn confirm_delete(&mut self, id: &str) -> Result<Notification, ControllerError> {
        self.actions.confirm(id, ActionKind::Delete)?;

        let result = guarded(&self.lifetime, self.timeout, self.backend.delete(id)).await;
        self.actions.settle(id);

        match result {
            Ok(()) => {
                info!(collection = R::COLLECTION, id, "deleted record");
                self.apply_remote_mutation(Mutation::Deleted(id.to_string()));
                Ok(self.notify(Notification::success(format!("{} deleted", capitalize(R::LABEL)))))
            }
            Err(None) => Err(ControllerError::Cancelled),
            Err(Some(source)) => Err(self.mutation_failed(ActionKind::Delete.verb(), source)),
        }
    }

    fn mutation_failed(&mut self, action: &'static str, source: ApiError) -> ControllerError {
        warn!(collection = R::COLLECTION, action, error = %source, "remote mutation failed");
        let err = ControllerError::Mutation {
            action,
            label: R::LABEL,
            source,
        };
        self.notify(Notification::error(err.to_string()));
        err
    }

    fn notify(&mut self, notification: Notification) -> Notification {
        self.notification = Some(notification.clone());
        notification
    }
}

/// Runs a backend call bounded by `timeout` and the controller lifetime.
/// `Err(None)` means the lifetime ended first.
async fn guarded<T, F>(
    lifetime: &CancellationToken,
    timeout: Duration,
    call: F,
) -> Result<T, Option<ApiError>>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if lifetime.is_cancelled() {
        return Err(None);
    }
    tokio::select! {
        _ = lifetime.cancelled() => Err(None),
        result = tokio::time::timeout(timeout, call) => match result {
            Ok(inner) => inner.map_err(Some),
            Err(_) => Err(Some(ApiError::Timeout(timeout))),
        },
    }
}

/// Copies `id` into a record through its wire form.
fn with_id_of<R: Record>(record: R, id: &str) -> R {
    let Ok(mut value) = serde_json::to_value(&record) else {
        return record;
    };
    if let Some(map) = value.as_object_mut() {
        map.insert("_id".to_string(), serde_json::Value::String(id.to_string()));
    }
    serde_json::from_value(value).unwrap_or(record)
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
