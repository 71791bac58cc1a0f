//! Metrics for the import and export stages.
//!
//! Metric names live in one enum so the recorder, the push snapshot and the
//! tests agree on spelling.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Import
    ImportRowsRead,
    ImportDocumentsCreated,
    ImportRowsSkipped,
    ImportRowsMalformed,
    ImportWriteErrors,
    ImportDuration,

    // Export
    ExportDocumentsParsed,
    ExportDocumentsSkipped,
    ExportRecordsSynced,
    ExportRecordsFailed,
    ExportBatchesSubmitted,
    ExportRelationshipRows,
    ExportRelationshipErrors,
    ExportBatchDuration,
    ExportDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ImportRowsRead => "fp_import_rows_read_total",
            MetricName::ImportDocumentsCreated => "fp_import_documents_created_total",
            MetricName::ImportRowsSkipped => "fp_import_rows_skipped_total",
            MetricName::ImportRowsMalformed => "fp_import_rows_malformed_total",
            MetricName::ImportWriteErrors => "fp_import_write_errors_total",
            MetricName::ImportDuration => "fp_import_duration_seconds",

            MetricName::ExportDocumentsParsed => "fp_export_documents_parsed_total",
            MetricName::ExportDocumentsSkipped => "fp_export_documents_skipped_total",
            MetricName::ExportRecordsSynced => "fp_export_records_synced_total",
            MetricName::ExportRecordsFailed => "fp_export_records_failed_total",
            MetricName::ExportBatchesSubmitted => "fp_export_batches_submitted_total",
            MetricName::ExportRelationshipRows => "fp_export_relationship_rows_total",
            MetricName::ExportRelationshipErrors => "fp_export_relationship_errors_total",
            MetricName::ExportBatchDuration => "fp_export_batch_duration_seconds",
            MetricName::ExportDuration => "fp_export_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Install the Prometheus recorder. Idempotent; failures only warn since
/// metrics are never required for a run to succeed.
pub fn init() {
    if HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_ok() {
                info!("Prometheus recorder installed");
            }
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Rendered exposition text, if the recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// Push the current snapshot to a Pushgateway as `job=fp_pipeline`.
pub async fn push_to_gateway(base_url: &str, instance: &str) {
    let Some(body) = render() else {
        warn!("Metrics recorder not installed; skipping Pushgateway push");
        return;
    };

    let push_url = format!(
        "{}/metrics/job/fp_pipeline/instance/{}",
        base_url.trim_end_matches('/'),
        instance
    );

    let client = reqwest::Client::new();
    let push_res = client
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await;

    match push_res {
        Ok(r) if r.status().is_success() => info!("Pushed metrics to Pushgateway for {}", instance),
        Ok(r) => warn!("Pushgateway push responded with status {} for {}", r.status().as_u16(), instance),
        Err(e) => warn!("Failed to push metrics to Pushgateway for {}: {}", instance, e),
    }
}

pub mod import {
    use super::MetricName;

    pub fn rows_read(n: usize) {
        ::metrics::counter!(MetricName::ImportRowsRead.as_str()).increment(n as u64);
    }

    pub fn document_created() {
        ::metrics::counter!(MetricName::ImportDocumentsCreated.as_str()).increment(1);
    }

    pub fn row_skipped(reason: &'static str) {
        ::metrics::counter!(MetricName::ImportRowsSkipped.as_str(), "reason" => reason).increment(1);
    }

    pub fn row_malformed() {
        ::metrics::counter!(MetricName::ImportRowsMalformed.as_str()).increment(1);
    }

    pub fn write_error() {
        ::metrics::counter!(MetricName::ImportWriteErrors.as_str()).increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::ImportDuration.as_str()).record(secs);
    }
}

pub mod export {
    use super::MetricName;

    pub fn document_parsed() {
        ::metrics::counter!(MetricName::ExportDocumentsParsed.as_str()).increment(1);
    }

    pub fn document_skipped(reason: &'static str) {
        ::metrics::counter!(MetricName::ExportDocumentsSkipped.as_str(), "reason" => reason)
            .increment(1);
    }

    pub fn batch_synced(records: usize, secs: f64) {
        ::metrics::counter!(MetricName::ExportBatchesSubmitted.as_str(), "outcome" => "ok").increment(1);
        ::metrics::counter!(MetricName::ExportRecordsSynced.as_str()).increment(records as u64);
        ::metrics::histogram!(MetricName::ExportBatchDuration.as_str()).record(secs);
    }

    pub fn batch_failed(records: usize, secs: f64) {
        ::metrics::counter!(MetricName::ExportBatchesSubmitted.as_str(), "outcome" => "error").increment(1);
        ::metrics::counter!(MetricName::ExportRecordsFailed.as_str()).increment(records as u64);
        ::metrics::histogram!(MetricName::ExportBatchDuration.as_str()).record(secs);
    }

    pub fn relationships_replaced(rows: usize) {
        ::metrics::counter!(MetricName::ExportRelationshipRows.as_str()).increment(rows as u64);
    }

    pub fn relationship_error() {
        ::metrics::counter!(MetricName::ExportRelationshipErrors.as_str()).increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::ExportDuration.as_str()).record(secs);
    }
}
