// crates/hot-updater-server/src/audit.rs
// ============================================================================
// Module: Server Audit Logging
// Description: Structured audit events for update checks and file delivery.
// Purpose: Emit one JSON line per decision to a pluggable sink.
// Dependencies: hot-updater-config, hot-updater-core, serde
// ============================================================================

//! ## Overview
//! Audit events are separate from `tracing` output so deployments can route the
//! decision journal independently. Device identifiers are never written; only
//! whether a device id was present.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use hot_updater_config::AuditConfig;
use hot_updater_config::AuditSinkKind;
use hot_updater_core::ResolutionRequest;
use hot_updater_core::UpdateInfo;
use hot_updater_core::UpdateStatus;
use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Check-update decision event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckUpdateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Requesting platform.
    pub platform: String,
    /// Requested channel.
    pub channel: String,
    /// Installed bundle id.
    pub bundle_id: String,
    /// Native build floor.
    pub min_bundle_id: String,
    /// Matching strategy label.
    pub strategy: &'static str,
    /// Whether a device id was presented.
    pub device_id_present: bool,
    /// Resolved bundle id.
    pub resolved_id: Option<String>,
    /// Resolved status.
    pub status: Option<UpdateStatus>,
    /// Outcome label: `update`, `rollback`, `none`, or `error`.
    pub outcome: &'static str,
    /// Error message for failed checks.
    pub error: Option<String>,
}

impl CheckUpdateAuditEvent {
    /// Builds an event from a request and its result.
    #[must_use]
    pub fn new(request: &ResolutionRequest, result: Result<Option<&UpdateInfo>, &str>) -> Self {
        let (resolved_id, status, outcome, error) = match result {
            Ok(Some(info)) => (
                Some(info.id.to_string()),
                Some(info.status),
                match info.status {
                    UpdateStatus::Update => "update",
                    UpdateStatus::Rollback => "rollback",
                },
                None,
            ),
            Ok(None) => (None, None, "none", None),
            Err(message) => (None, None, "error", Some(message.to_string())),
        };
        Self {
            event: "check_update",
            timestamp_ms: now_ms(),
            platform: request.platform.to_string(),
            channel: request.channel.to_string(),
            bundle_id: request.bundle_id.to_string(),
            min_bundle_id: request.min_bundle_id.to_string(),
            strategy: request.strategy.label(),
            device_id_present: request.device_id.is_some(),
            resolved_id,
            status,
            outcome,
            error,
        }
    }
}

/// File delivery verification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Requested object key.
    pub key: String,
    /// HTTP status returned.
    pub status_code: u16,
    /// Outcome label: `served` or `rejected`.
    pub outcome: &'static str,
    /// Bytes served.
    pub bytes: usize,
}

impl DeliveryAuditEvent {
    /// Builds a delivery event.
    #[must_use]
    pub fn new(key: &str, status_code: u16, bytes: usize) -> Self {
        Self {
            event: "file_delivery",
            timestamp_ms: now_ms(),
            key: key.to_string(),
            status_code,
            outcome: if status_code == 200 { "served" } else { "rejected" },
            bytes,
        }
    }
}

/// Returns milliseconds since the unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for server decisions.
pub trait AuditSink: Send + Sync {
    /// Records a check-update decision.
    fn record_check_update(&self, event: &CheckUpdateAuditEvent);

    /// Records a file delivery verification.
    fn record_delivery(&self, event: &DeliveryAuditEvent);
}

/// Audit sink that writes JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_check_update(&self, event: &CheckUpdateAuditEvent) {
        write_line(&mut io::stderr(), event);
    }

    fn record_delivery(&self, event: &DeliveryAuditEvent) {
        write_line(&mut io::stderr(), event);
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record_check_update(&self, event: &CheckUpdateAuditEvent) {
        if let Ok(mut file) = self.file.lock() {
            write_line(&mut *file, event);
        }
    }

    fn record_delivery(&self, event: &DeliveryAuditEvent) {
        if let Ok(mut file) = self.file.lock() {
            write_line(&mut *file, event);
        }
    }
}

/// Audit sink that discards events.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_check_update(&self, _event: &CheckUpdateAuditEvent) {}

    fn record_delivery(&self, _event: &DeliveryAuditEvent) {}
}

/// Serializes one event as a line; write failures are ignored.
fn write_line(writer: &mut impl Write, event: &impl Serialize) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(writer, "{payload}");
        let _ = writer.flush();
    }
}

/// Builds the configured audit sink.
///
/// # Errors
///
/// Returns an error when the file sink cannot be opened.
pub fn build_audit_sink(config: &AuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    Ok(match (config.sink, &config.path) {
        (AuditSinkKind::File, Some(path)) => Arc::new(FileAuditSink::new(path)?),
        (AuditSinkKind::File, None) => {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "audit.path is required"));
        }
        (AuditSinkKind::Stderr, _) => Arc::new(StderrAuditSink),
        (AuditSinkKind::None, _) => Arc::new(NoopAuditSink),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use hot_updater_core::BundleId;
    use hot_updater_core::Platform;

    use super::*;

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        let request = ResolutionRequest::app_version(Platform::Ios, BundleId::nil(), "1.0.0")
            .with_device_id("device-1");
        let info = UpdateInfo::nil_rollback();
        sink.record_check_update(&CheckUpdateAuditEvent::new(&request, Ok(Some(&info))));
        sink.record_delivery(&DeliveryAuditEvent::new("b1/bundle.zip", 403, 0));
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "check_update");
        assert_eq!(lines[0]["outcome"], "rollback");
        assert_eq!(lines[0]["status"], "ROLLBACK");
        assert_eq!(lines[0]["device_id_present"], true);
        assert!(!content.contains("device-1"));
        assert_eq!(lines[1]["outcome"], "rejected");
    }

    #[test]
    fn error_outcome_carries_message() {
        let request = ResolutionRequest::fingerprint(Platform::Android, BundleId::nil(), "fp");
        let event = CheckUpdateAuditEvent::new(&request, Err("boom"));
        assert_eq!(event.outcome, "error");
        assert_eq!(event.strategy, request.strategy.label());
        assert_eq!(event.error.as_deref(), Some("boom"));
    }
}
