use std::sync::Mutex;

use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub body: String,
}

/// Observability sink for structured run notices. The pipeline only
/// depends on this seam; where the notices end up is the caller's
/// choice.
pub trait Notify: Send + Sync {
    fn notify(&self, severity: Severity, title: &str, body: &str);
}

/// Routes notices into the process log.
pub struct LogNotifier;

impl Notify for LogNotifier {
    fn notify(&self, severity: Severity, title: &str, body: &str) {
        match severity {
            Severity::Info => info!("{}: {}", title, body),
            Severity::Warning => warn!("{}: {}", title, body),
            Severity::Error => error!("{}: {}", title, body),
        }
    }
}

/// Buffers notices in memory so they can be inspected after a run.
#[derive(Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Notify for MemoryNotifier {
    fn notify(&self, severity: Severity, title: &str, body: &str) {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Notice {
                severity,
                title: title.to_string(),
                body: body.to_string(),
            });
    }
}
