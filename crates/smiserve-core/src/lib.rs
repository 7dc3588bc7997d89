pub mod catalog;
pub mod coerce;
pub mod collector;
pub mod config;
pub mod document;
pub mod error;
pub mod executor;

pub use catalog::{
    catalog, core_fields, full_fields, optional_fields, FieldGroup, FieldSpec, PROCESS_FIELDS,
};
pub use coerce::{coerce, MetricValue, ValueKind};
pub use collector::{GpuSnapshot, MetricsCollector, Tier};
pub use config::SmiConfig;
pub use document::{GpuRecord, MetricsDocument, ProcessRecord};
pub use error::{Result, SmiError};
pub use executor::{NvidiaSmi, QueryKind, SmiExecutor};
