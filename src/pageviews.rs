//! Virtual pageview logging.
//!
//! When a preview has been shown long enough to count as a view, the UI queues
//! a pageview. The change listener here turns the queued pageview into a
//! `VirtualPageView` event and tells the store it has been logged.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const VIRTUAL_PAGE_VIEW_TOPIC: &str = "event.VirtualPageView";

/// The page the reader is on, i.e. the source of any previewed link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub namespace_id: i32,
    pub id: u64,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedPageview {
    pub page_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageviewsState {
    pub page: PageContext,
    pub pageview: Option<QueuedPageview>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualPageViewEvent {
    pub page_title: String,
    pub source_url: String,
    pub source_page_id: u64,
    pub source_namespace: i32,
    pub source_title: String,
}

impl VirtualPageViewEvent {
    pub fn new(page: &PageContext, pageview: &QueuedPageview) -> Self {
        Self {
            page_title: pageview.page_title.clone(),
            source_url: page.url.clone(),
            source_page_id: page.id,
            source_namespace: page.namespace_id,
            source_title: page.title.clone(),
        }
    }
}

/// Sink for analytics events.
pub trait PageviewTracker {
    fn track(&self, topic: &str, event: &VirtualPageViewEvent);
}

/// Actions the listener dispatches back to the state owner.
pub trait PageviewActions {
    fn pageview_logged(&self);
}

pub struct PageviewsListener<A, T> {
    actions: A,
    tracker: T,
}

impl<A: PageviewActions, T: PageviewTracker> PageviewsListener<A, T> {
    pub fn new(actions: A, tracker: T) -> Self {
        Self { actions, tracker }
    }

    /// Logs the queued pageview in `state`, if any.
    pub fn on_change(&self, _prev: Option<&PageviewsState>, state: &PageviewsState) {
        let Some(pageview) = &state.pageview else {
            return;
        };
        let event = VirtualPageViewEvent::new(&state.page, pageview);
        self.tracker.track(VIRTUAL_PAGE_VIEW_TOPIC, &event);
        self.actions.pageview_logged();
    }
}

/// Shared owner of the pageview state.
#[derive(Debug, Clone)]
pub struct PageviewStore {
    inner: Arc<RwLock<PageviewsState>>,
}

impl PageviewStore {
    pub fn new(page: PageContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PageviewsState {
                page,
                pageview: None,
            })),
        }
    }

    pub fn queue_pageview(&self, page_title: impl Into<String>) {
        self.inner.write().pageview = Some(QueuedPageview {
            page_title: page_title.into(),
        });
    }

    pub fn snapshot(&self) -> PageviewsState {
        self.inner.read().clone()
    }
}

impl PageviewActions for PageviewStore {
    fn pageview_logged(&self) {
        self.inner.write().pageview = None;
    }
}
