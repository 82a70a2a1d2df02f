use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{DeviceInfo, NetworkCounters, Protocol, ReportFormat, ResourceSample, SdkKind};
use crate::ports::ReportUploader;

use super::format::{format_bytes, format_value};
use super::health::{AnalysisEntry, HealthItemProducer};
use super::registry::{HealthRegistry, RegistryError, DEFAULT_BUCKETS};

const REPORT_VERSION: &str = "1.0.0";
const NODE_SDK_ANALYSIS: &str = "sdkAnalysis";
const NODE_BASE_ARRAY: &str = "analysisItem";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to append fragment: {0}")]
    Fragment(String),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to upload report: {0}")]
    Upload(String),

    #[error("failed to register health item: {0}")]
    Registry(#[from] RegistryError),
}

/// Name of the operating system the report was produced on
pub fn host_os_name() -> &'static str {
    if cfg!(windows) {
        "Windows"
    } else if cfg!(target_os = "linux") {
        "Linux"
    } else {
        std::env::consts::OS
    }
}

/// Root metadata of a report, passed in once at initialization
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub os_type: String,
    pub sdk: SdkKind,
    pub protocol: Protocol,
    pub device: Option<DeviceInfo>,
}

impl ReportMetadata {
    pub fn new(sdk: SdkKind, protocol: Protocol) -> Self {
        Self {
            os_type: host_os_name().to_string(),
            sdk,
            protocol,
            device: None,
        }
    }

    pub fn with_device(mut self, device: DeviceInfo) -> Self {
        self.device = Some(device);
        self
    }
}

enum ReportBody {
    Json(Value),
    Csv(String),
}

/// Accumulates analysis entries and writes them out as one document
pub struct Report {
    metadata: ReportMetadata,
    body: ReportBody,
    items: HealthRegistry<Box<dyn HealthItemProducer>>,
    entries: usize,
}

impl Report {
    pub fn initialize(format: ReportFormat, metadata: ReportMetadata) -> Self {
        let body = match format {
            ReportFormat::Json => {
                let mut analysis = json!({
                    "version": REPORT_VERSION,
                    "osType": metadata.os_type,
                    "sdkType": metadata.sdk.display_name(),
                    "transport": metadata.protocol.display_name(),
                    "reportDate": Utc::now().to_rfc3339(),
                });
                if let Some(device) = &metadata.device {
                    analysis["deviceInfo"] = json!({
                        "cpuCount": device.cpu_count,
                        "availMemory": device.avail_memory,
                    });
                }
                analysis[NODE_BASE_ARRAY] = Value::Array(Vec::new());
                let mut root = serde_json::Map::new();
                root.insert(NODE_SDK_ANALYSIS.to_string(), analysis);
                ReportBody::Json(Value::Object(root))
            }
            ReportFormat::Csv => ReportBody::Csv(String::new()),
        };

        debug!(?format, sdk = %metadata.sdk, protocol = %metadata.protocol, "Report initialized");
        Self {
            metadata,
            body,
            items: health_table(DEFAULT_BUCKETS),
            entries: 0,
        }
    }

    /// Size the health item table; call before registering items.
    pub fn with_health_buckets(mut self, buckets: usize) -> Self {
        self.items = health_table(buckets);
        self
    }

    pub fn format(&self) -> ReportFormat {
        match self.body {
            ReportBody::Json(_) => ReportFormat::Json,
            ReportBody::Csv(_) => ReportFormat::Csv,
        }
    }

    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    /// Number of fragments appended so far
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn record_binary_size(&mut self, description: &str, size: u64) -> Result<(), ReportError> {
        debug!(description, size, "Recording binary size");
        self.record(&AnalysisEntry::DiskSize { size })
    }

    pub fn record_memory_usage(
        &mut self,
        description: &str,
        sample: &ResourceSample,
    ) -> Result<(), ReportError> {
        self.record(&AnalysisEntry::MemoryUsage {
            description: description.to_string(),
            sample: sample.clone(),
        })
    }

    pub fn record_network_usage(
        &mut self,
        description: &str,
        counters: &NetworkCounters,
    ) -> Result<(), ReportError> {
        self.record(&AnalysisEntry::Network {
            description: description.to_string(),
            counters: *counters,
        })
    }

    /// Append one fragment; on failure the accumulated document is left untouched.
    fn record(&mut self, entry: &AnalysisEntry) -> Result<(), ReportError> {
        let appended = match &mut self.body {
            ReportBody::Json(root) => append_json(root, json_fragment(entry)),
            ReportBody::Csv(buffer) => append_csv(buffer, &csv_row(entry)),
        };

        match appended {
            Ok(()) => {
                self.entries += 1;
                Ok(())
            }
            Err(e) => {
                error!(analysis_type = entry.analysis_type(), "Dropping report fragment: {}", e);
                Err(e)
            }
        }
    }

    /// Register a producer; an existing key is replaced.
    pub fn register_health_item(
        &mut self,
        key: u32,
        producer: Box<dyn HealthItemProducer>,
    ) -> Result<(), ReportError> {
        if self.items.add(key, producer)?.is_some() {
            debug!(key, "Replaced health item");
        }
        debug!(
            key,
            registered = self.items.len(),
            buckets = self.items.bucket_count(),
            "Registered health item"
        );
        Ok(())
    }

    /// Record the fragment of every registered item in key order, returning
    /// how many were recorded.
    pub fn process_health_run(&mut self) -> usize {
        let mut produced: Vec<(u32, AnalysisEntry)> =
            self.items.iter().map(|(key, item)| (key, item.produce())).collect();
        produced.sort_by_key(|(key, _)| *key);

        produced
            .into_iter()
            .filter(|(_, entry)| {
                let recorded = match entry {
                    AnalysisEntry::DiskSize { size } => self.record_binary_size("target", *size),
                    AnalysisEntry::MemoryUsage {
                        description,
                        sample,
                    } => self.record_memory_usage(description, sample),
                    AnalysisEntry::Network {
                        description,
                        counters,
                    } => self.record_network_usage(description, counters),
                };
                recorded.is_ok()
            })
            .count()
    }

    /// Serialized document as it would be written
    pub fn document(&self) -> Result<String, ReportError> {
        match &self.body {
            ReportBody::Json(root) => Ok(serde_json::to_string_pretty(root)?),
            ReportBody::Csv(buffer) => Ok(buffer.clone()),
        }
    }

    /// Write the report to `output` (stdout when `None`) and optionally upload it.
    ///
    /// JSON replaces the file, CSV appends to it. Upload failures are logged
    /// but do not fail the write.
    pub fn write(
        &self,
        output: Option<&Path>,
        uploader: Option<&dyn ReportUploader>,
    ) -> Result<(), ReportError> {
        let document = self.document()?;

        match output {
            Some(path) => {
                self.write_file(path, &document)?;
                info!(path = %path.display(), entries = self.entries, "Report written");
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(document.as_bytes())
                    .and_then(|_| stdout.write_all(b"\n"))
                    .and_then(|_| stdout.flush())
                    .map_err(|source| ReportError::Write {
                        path: PathBuf::from("<stdout>"),
                        source,
                    })?;
            }
        }

        if let Some(uploader) = uploader {
            if let Err(e) = self.upload(&document, uploader) {
                warn!("{}", e);
            }
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, document: &str) -> Result<(), ReportError> {
        let result = match self.body {
            ReportBody::Json(_) => fs::write(path, document),
            ReportBody::Csv(_) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(document.as_bytes())),
        };
        result.map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn upload(&self, document: &str, uploader: &dyn ReportUploader) -> Result<(), ReportError> {
        debug!(target_url = uploader.target(), "Uploading report");
        uploader
            .upload(document, self.format())
            .map_err(|e| ReportError::Upload(e.to_string()))
    }

    /// Release the document and every registered item.
    pub fn deinitialize(mut self) {
        self.items.clear();
        debug!(entries = self.entries, "Report released");
    }
}

fn health_table(buckets: usize) -> HealthRegistry<Box<dyn HealthItemProducer>> {
    HealthRegistry::new(buckets).with_on_remove(Box::new(|key, _item| debug!(key, "Released health item")))
}

fn json_fragment(entry: &AnalysisEntry) -> Value {
    match entry {
        AnalysisEntry::DiskSize { size } => json!({
            "analysisType": entry.analysis_type(),
            "size": format_bytes(*size, false),
        }),
        AnalysisEntry::MemoryUsage {
            description,
            sample,
        } => json!({
            "analysisType": entry.analysis_type(),
            "description": description,
            "threads": format_bytes(u64::from(sample.threads), false),
            "memory": format_bytes(sample.memory_bytes, false),
            "handles": format_bytes(u64::from(sample.handles), false),
            "cpuLoad": sample.cpu_load.to_string(),
        }),
        AnalysisEntry::Network {
            description,
            counters,
        } => json!({
            "analysisType": entry.analysis_type(),
            "description": description,
            "msgSize": counters.msg_size,
            "transmitBytes": format_value(counters.bytes_sent),
            "transmitCount": format_value(counters.packets_sent),
            "recvBytes": format_value(counters.bytes_recv),
            "recvCount": format_value(counters.packets_recv),
        }),
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One CSV line, fields in the same order as the JSON fragment
fn csv_row(entry: &AnalysisEntry) -> String {
    let fields: Vec<String> = match entry {
        AnalysisEntry::DiskSize { size } => {
            vec![entry.analysis_type().to_string(), format_bytes(*size, false)]
        }
        AnalysisEntry::MemoryUsage {
            description,
            sample,
        } => vec![
            entry.analysis_type().to_string(),
            description.clone(),
            format_bytes(u64::from(sample.threads), false),
            format_bytes(sample.memory_bytes, false),
            format_bytes(u64::from(sample.handles), false),
            sample.cpu_load.to_string(),
        ],
        AnalysisEntry::Network {
            description,
            counters,
        } => vec![
            entry.analysis_type().to_string(),
            description.clone(),
            counters.msg_size.to_string(),
            format_value(counters.bytes_sent),
            format_value(counters.packets_sent),
            format_value(counters.bytes_recv),
            format_value(counters.packets_recv),
        ],
    };

    let mut row = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    row.push('\n');
    row
}

fn append_json(root: &mut Value, fragment: Value) -> Result<(), ReportError> {
    let items = root
        .get_mut(NODE_SDK_ANALYSIS)
        .and_then(|analysis| analysis.get_mut(NODE_BASE_ARRAY))
        .and_then(Value::as_array_mut)
        .ok_or_else(|| ReportError::Fragment(format!("missing {} array", NODE_BASE_ARRAY)))?;
    items
        .try_reserve(1)
        .map_err(|e| ReportError::Fragment(e.to_string()))?;
    items.push(fragment);
    Ok(())
}

fn append_csv(buffer: &mut String, row: &str) -> Result<(), ReportError> {
    buffer
        .try_reserve(row.len())
        .map_err(|e| ReportError::Fragment(e.to_string()))?;
    buffer.push_str(row);
    Ok(())
}
