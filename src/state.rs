//! Shared application state for all routes.

use crate::history::HistoryRecorder;
use crate::store::HistoryStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub recorder: HistoryRecorder,
}

impl AppState {
    pub fn new(store: Arc<dyn HistoryStore>, timeout: Duration) -> Self {
        AppState {
            recorder: HistoryRecorder::new(store, timeout),
        }
    }
}
