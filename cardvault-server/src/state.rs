//! Shared application state handed to every handler

use std::sync::Arc;

use cardvault_core::{Entity, LogEvent, LoggingService, RecordStore};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub events: Option<Arc<LoggingService>>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            events: None,
        }
    }

    /// Also write request outcomes to the event log
    pub fn with_events(mut self, events: Arc<LoggingService>) -> Self {
        self.events = Some(events);
        self
    }

    /// Record the outcome of a mutating request
    ///
    /// Success logs `action` with the record id, failure logs `{action}_failed`
    /// with the error text. Logging failures never fail the request.
    pub fn track<T, E: std::fmt::Display>(
        &self,
        result: &Result<T, E>,
        action: &str,
        entity: Entity,
        command: &str,
        record_id: impl FnOnce(&T) -> String,
    ) {
        let Some(events) = &self.events else {
            return;
        };

        let event = match result {
            Ok(value) => LogEvent::new(action).with_record(entity, record_id(value)),
            Err(e) => LogEvent::new(format!("{action}_failed"))
                .with_entity(entity)
                .with_error(e.to_string()),
        };

        if let Err(e) = events.log(event.with_command(command)) {
            tracing::warn!(error = %e, "Failed to write event log");
        }
    }
}
