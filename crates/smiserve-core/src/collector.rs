use chrono::Local;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{core_fields, full_fields, PROCESS_FIELDS};
use crate::coerce::{coerce, MetricValue};
use crate::document::{GpuRecord, MetricsDocument, ProcessRecord};
use crate::executor::{QueryKind, SmiExecutor};

/// GPU query attempts, tried in order: `Full`, then `CoreOnly`, then nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Full,
    CoreOnly,
}

impl Tier {
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            Tier::Full => full_fields(),
            Tier::CoreOnly => core_fields(),
        }
    }

    pub fn fallback(&self) -> Option<Tier> {
        match self {
            Tier::Full => Some(Tier::CoreOnly),
            Tier::CoreOnly => None,
        }
    }
}

/// GPU records together with the tier that produced them. `tier` is `None`
/// when every tier failed.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuSnapshot {
    pub tier: Option<Tier>,
    pub gpus: Vec<GpuRecord>,
}

pub fn timestamp_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn split_rows<'a>(raw: &'a str) -> impl Iterator<Item = Vec<&'a str>> + 'a {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').map(str::trim).collect())
}

/// Maps each CSV row onto `fields` by position. Cells missing from a short row become null.
pub fn parse_gpu_rows(raw: &str, fields: &[&str]) -> Vec<GpuRecord> {
    split_rows(raw)
        .map(|cells| {
            fields
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let value = cells
                        .get(i)
                        .map(|cell| coerce(field, cell))
                        .unwrap_or(MetricValue::Null);
                    (field.to_string(), value)
                })
                .collect::<GpuRecord>()
        })
        .collect()
}

pub fn parse_process_rows(raw: &str) -> Vec<ProcessRecord> {
    split_rows(raw)
        .filter_map(|cells| match cells.as_slice() {
            [gpu_bus_id, pid, process_name, used_memory, ..] => Some(ProcessRecord {
                gpu_bus_id: gpu_bus_id.to_string(),
                pid: pid.to_string(),
                process_name: process_name.to_string(),
                used_memory: used_memory.to_string(),
            }),
            _ => {
                debug!(cells = cells.len(), "skipping short process row");
                None
            }
        })
        .collect()
}

pub struct MetricsCollector<E> {
    executor: E,
}

impl<E: SmiExecutor> MetricsCollector<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Builds a fresh document. Query failures degrade to empty lists and never escape.
    #[instrument(skip(self))]
    pub fn collect(&self) -> MetricsDocument {
        let timestamp = timestamp_now();
        let snapshot = self.collect_gpus();
        let processes = self.collect_processes();

        info!(
            tier = ?snapshot.tier,
            gpus = snapshot.gpus.len(),
            processes = processes.len(),
            "collected GPU metrics"
        );

        MetricsDocument {
            timestamp,
            gpus: snapshot.gpus,
            processes,
        }
    }

    pub fn collect_gpus(&self) -> GpuSnapshot {
        let mut tier = Some(Tier::Full);

        while let Some(current) = tier {
            let fields = current.fields();
            match self.executor.query(QueryKind::Gpu, &fields) {
                Ok(raw) => {
                    return GpuSnapshot {
                        tier: Some(current),
                        gpus: parse_gpu_rows(&raw, &fields),
                    };
                }
                Err(e) => {
                    warn!(
                        tier = ?current,
                        unavailable = e.is_unavailable(),
                        "GPU query failed: {}",
                        e
                    );
                    tier = current.fallback();
                }
            }
        }

        GpuSnapshot {
            tier: None,
            gpus: Vec::new(),
        }
    }

    pub fn collect_processes(&self) -> Vec<ProcessRecord> {
        match self.executor.query(QueryKind::ComputeApps, &PROCESS_FIELDS) {
            Ok(raw) => parse_process_rows(&raw),
            Err(e) => {
                debug!("process query returned nothing: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::optional_fields;
    use crate::error::{Result, SmiError};
    use std::sync::Mutex;

    /// Replays canned outputs. GPU responses are consumed in order, one per GPU query.
    struct ScriptedSmi {
        gpu: Mutex<Vec<Result<String>>>,
        processes: Mutex<Option<Result<String>>>,
        gpu_calls: Mutex<Vec<usize>>,
    }

    impl ScriptedSmi {
        fn new(gpu: Vec<Result<String>>, processes: Result<String>) -> Self {
            Self {
                gpu: Mutex::new(gpu.into_iter().rev().collect()),
                processes: Mutex::new(Some(processes)),
                gpu_calls: Mutex::new(Vec::new()),
            }
        }

        fn gpu_call_sizes(&self) -> Vec<usize> {
            self.gpu_calls.lock().unwrap().clone()
        }
    }

    impl SmiExecutor for ScriptedSmi {
        fn query(&self, kind: QueryKind, fields: &[&str]) -> Result<String> {
            match kind {
                QueryKind::Gpu => {
                    self.gpu_calls.lock().unwrap().push(fields.len());
                    self.gpu.lock().unwrap().pop().unwrap_or(Err(SmiError::EmptyOutput))
                }
                QueryKind::ComputeApps => self
                    .processes
                    .lock()
                    .unwrap()
                    .take()
                    .unwrap_or(Err(SmiError::EmptyOutput)),
            }
        }
    }

    fn failed() -> Result<String> {
        Err(SmiError::NonZeroExit {
            status: exit_status(2),
            stderr: "Field \"fan.speed\" is not a valid field to query.".to_string(),
        })
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }

    fn csv_row(fields: &[&str], overrides: &[(&str, &str)]) -> String {
        fields
            .iter()
            .map(|field| {
                overrides
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, value)| *value)
                    .unwrap_or("1")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    const PROCESSES: &str =
        "00000000:01:00.0, 4242, /usr/bin/python3, 2048\n00000000:02:00.0, 777, ollama, 512\n";

    #[test]
    fn test_tier_sequence() {
        assert_eq!(Tier::Full.fallback(), Some(Tier::CoreOnly));
        assert_eq!(Tier::CoreOnly.fallback(), None);
        assert_eq!(Tier::CoreOnly.fields(), core_fields());
    }

    #[test]
    fn test_full_query_success() {
        let full = full_fields();
        let raw = csv_row(
            &full,
            &[
                ("temperature.gpu", "63"),
                ("utilization.gpu", "98.0"),
                ("memory.total", "[Not Supported]"),
                ("name", "NVIDIA A100-SXM4-80GB"),
            ],
        );
        let smi = ScriptedSmi::new(vec![Ok(raw)], Ok(PROCESSES.to_string()));

        let doc = MetricsCollector::new(smi).collect();

        assert_eq!(doc.gpus.len(), 1);
        let gpu = &doc.gpus[0];
        assert_eq!(gpu.keys().collect::<Vec<_>>(), full);
        assert_eq!(gpu.get("temperature.gpu"), Some(&MetricValue::Int(63)));
        assert_eq!(gpu.get("utilization.gpu"), Some(&MetricValue::Float(98.0)));
        assert_eq!(gpu.get("memory.total"), Some(&MetricValue::Null));
        assert_eq!(
            gpu.get("name"),
            Some(&MetricValue::Text("NVIDIA A100-SXM4-80GB".to_string()))
        );
        assert_eq!(doc.processes.len(), 2);
    }

    #[test]
    fn test_fallback_to_core_fields() {
        let core = core_fields();
        let smi = ScriptedSmi::new(vec![failed(), Ok(csv_row(&core, &[]))], failed());
        let collector = MetricsCollector::new(smi);

        let snapshot = collector.collect_gpus();

        assert_eq!(snapshot.tier, Some(Tier::CoreOnly));
        assert_eq!(snapshot.gpus[0].keys().collect::<Vec<_>>(), core);
        for field in optional_fields() {
            assert!(snapshot.gpus[0].get(field).is_none());
        }
        assert_eq!(
            collector.executor().gpu_call_sizes(),
            vec![full_fields().len(), core.len()]
        );
    }

    #[test]
    fn test_both_tiers_fail() {
        let smi = ScriptedSmi::new(vec![failed(), failed()], Ok(PROCESSES.to_string()));
        let collector = MetricsCollector::new(smi);

        let doc = collector.collect();

        assert!(doc.gpus.is_empty());
        assert_eq!(doc.processes.len(), 2);
        assert!(!doc.timestamp.is_empty());
        assert_eq!(collector.executor().gpu_call_sizes().len(), 2);
    }

    #[test]
    fn test_tool_not_found() {
        let not_found = || {
            Err(SmiError::NotFound {
                binary: "nvidia-smi".to_string(),
            })
        };
        let smi = ScriptedSmi::new(vec![not_found(), not_found()], not_found());

        let doc = MetricsCollector::new(smi).collect();
        let json = serde_json::to_value(&doc).expect("serialize");

        assert_eq!(json["gpus"], serde_json::json!([]));
        assert_eq!(json["processes"], serde_json::json!([]));
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_process_failure_keeps_gpus() {
        let full = full_fields();
        let smi = ScriptedSmi::new(vec![Ok(csv_row(&full, &[]))], failed());

        let doc = MetricsCollector::new(smi).collect();

        assert_eq!(doc.gpus.len(), 1);
        assert!(doc.processes.is_empty());
    }

    #[test]
    fn test_gpu_order_preserved() {
        let full = full_fields();
        let raw = format!(
            "{}\n{}\n",
            csv_row(&full, &[("index", "1"), ("name", "GPU1")]),
            csv_row(&full, &[("index", "0"), ("name", "GPU0")]),
        );
        let smi = ScriptedSmi::new(vec![Ok(raw)], failed());

        let doc = MetricsCollector::new(smi).collect();

        let names: Vec<_> = doc.gpus.iter().map(|gpu| gpu.get("name").cloned()).collect();
        assert_eq!(
            names,
            vec![
                Some(MetricValue::Text("GPU1".to_string())),
                Some(MetricValue::Text("GPU0".to_string())),
            ]
        );
    }

    #[test]
    fn test_parse_gpu_rows_short_row_fills_null() {
        let fields = ["temperature.gpu", "utilization.gpu", "memory.total"];
        let rows = parse_gpu_rows("63, 98.0\n\n", &fields);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), fields);
        assert_eq!(rows[0].get("memory.total"), Some(&MetricValue::Null));
    }

    #[test]
    fn test_parse_gpu_rows_scenario() {
        let fields = ["temperature.gpu", "utilization.gpu", "memory.total"];
        let rows = parse_gpu_rows("63, 98.0, [Not Supported]\n", &fields);
        let json = serde_json::to_string(&rows[0]).expect("serialize");

        assert_eq!(
            json,
            r#"{"temperature.gpu":63,"utilization.gpu":98.0,"memory.total":null}"#
        );
    }

    #[test]
    fn test_parse_process_rows() {
        let rows = parse_process_rows("00000000:01:00.0, 4242, python, 2048\nbroken, row\n");

        assert_eq!(
            rows,
            vec![ProcessRecord {
                gpu_bus_id: "00000000:01:00.0".to_string(),
                pid: "4242".to_string(),
                process_name: "python".to_string(),
                used_memory: "2048".to_string(),
            }]
        );
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp_now();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S%.6f").is_ok());
    }
}
