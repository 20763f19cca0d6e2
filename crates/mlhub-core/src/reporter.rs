//! Reporter trait for dependency injection
//!
//! Core operations report progress through this trait so they are not tied
//! to a terminal. The binary supplies a styled implementation; tests use
//! [`NullReporter`] or a recording double.

/// Progress and status sink for long-running operations.
pub trait Reporter: Send + Sync {
    /// A new phase has started (e.g. "Fetching", "Configuring").
    fn section(&self, title: &str);

    /// Progress of a download, in bytes.
    fn downloading(&self, name: &str, current: u64, total: Option<u64>);

    /// An archive is being unpacked.
    fn extracting(&self, name: &str);

    /// Something is being installed; `detail` says what.
    fn installing(&self, name: &str, detail: &str);

    /// An item finished successfully.
    fn done(&self, name: &str, detail: &str, size: Option<u64>);

    /// An item failed.
    fn failed(&self, name: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, name: &str, current: u64, total: Option<u64>) {
        (**self).downloading(name, current, total);
    }
    fn extracting(&self, name: &str) {
        (**self).extracting(name);
    }
    fn installing(&self, name: &str, detail: &str) {
        (**self).installing(name, detail);
    }
    fn done(&self, name: &str, detail: &str, size: Option<u64>) {
        (**self).done(name, detail, size);
    }
    fn failed(&self, name: &str, reason: &str) {
        (**self).failed(name, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &str) {}
    fn installing(&self, _: &str, _: &str) {}
    fn done(&self, _: &str, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

/// Collects warnings and failures so tests can assert on them.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: std::sync::Mutex<Vec<String>>,
}

impl RecordingReporter {
    /// Everything recorded so far, in order, prefixed by kind.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn push(&self, kind: &str, msg: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(format!("{kind}: {msg}"));
        }
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, title: &str) {
        self.push("section", title);
    }
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn extracting(&self, name: &str) {
        self.push("extracting", name);
    }
    fn installing(&self, name: &str, detail: &str) {
        self.push("installing", &format!("{name} {detail}"));
    }
    fn done(&self, name: &str, detail: &str, _: Option<u64>) {
        self.push("done", &format!("{name} {detail}"));
    }
    fn failed(&self, name: &str, reason: &str) {
        self.push("failed", &format!("{name} {reason}"));
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn success(&self, msg: &str) {
        self.push("success", msg);
    }
    fn warning(&self, msg: &str) {
        self.push("warning", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
}
