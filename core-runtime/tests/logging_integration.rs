//! Integration tests for logging system

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CapturingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl LoggerSink for CapturingSink {
    fn log(&self, entry: LogEntry) -> BridgeResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[test]
fn test_logging_config_builder() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
}

#[test]
fn test_format_selection() {
    // Debug builds should default to Pretty
    #[cfg(debug_assertions)]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[cfg(not(debug_assertions))]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Compact);
    }
}

#[test]
fn test_filter_configuration() {
    let config = LoggingConfig::default().with_filter("core_bridge=debug,core_service=trace");

    assert_eq!(
        config.filter,
        Some("core_bridge=debug,core_service=trace".to_string())
    );
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_target(false)
        .with_threads(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.show_target);
    assert!(config.show_threads);
}

// Only test in this binary that installs the global subscriber.
#[test]
fn test_init_logging_forwards_to_sink() {
    let sink = Arc::new(CapturingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_filter("debug")
        .with_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(task_id = "cb-7", "dispatch resolved");
    tracing::trace!("below the sink threshold");

    let entries = sink.entries.lock().unwrap();
    let entry = entries
        .iter()
        .find(|e| e.message == "dispatch resolved")
        .expect("info event reaches the sink");

    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.fields.get("task_id").map(String::as_str), Some("cb-7"));
    assert!(!entries.iter().any(|e| e.message == "below the sink threshold"));

    drop(entries);
    assert!(init_logging(LoggingConfig::default()).is_err());
}
