//! Status reporting from the engine to its host
//!
//! The engine reports user-facing status through an [`EngineObserver`]
//! given at construction, so it has no dependency on any particular UI.

use std::fmt;

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusLevel::Info => "info",
            StatusLevel::Success => "success",
            StatusLevel::Error => "error",
        })
    }
}

/// Receives status messages from the engine
pub trait EngineObserver {
    fn status(&self, level: StatusLevel, message: &str);
}

/// Forwards status messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn status(&self, level: StatusLevel, message: &str) {
        match level {
            StatusLevel::Info | StatusLevel::Success => {
                tracing::info!(%level, "{message}");
            }
            StatusLevel::Error => {
                tracing::warn!(%level, "{message}");
            }
        }
    }
}

/// Discards status messages
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl EngineObserver for NullObserver {
    fn status(&self, _level: StatusLevel, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recording(RefCell<Vec<(StatusLevel, String)>>);

    impl EngineObserver for Recording {
        fn status(&self, level: StatusLevel, message: &str) {
            self.0.borrow_mut().push((level, message.to_string()));
        }
    }

    #[test]
    fn observers_are_object_safe() {
        let recording = Recording::default();
        let observers: Vec<&dyn EngineObserver> = vec![&TracingObserver, &NullObserver, &recording];
        for observer in observers {
            observer.status(StatusLevel::Success, "Scale set");
        }
        assert_eq!(
            recording.0.borrow().as_slice(),
            &[(StatusLevel::Success, "Scale set".to_string())]
        );
    }

    #[test]
    fn level_display() {
        assert_eq!(StatusLevel::Error.to_string(), "error");
    }
}
