use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::coerce::MetricValue;

/// One GPU at one point in time. Keys keep the order of the query that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuRecord {
    fields: Vec<(String, MetricValue)>,
}

impl GpuRecord {
    pub fn get(&self, field: &str) -> Option<&MetricValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

impl FromIterator<(String, MetricValue)> for GpuRecord {
    fn from_iter<I: IntoIterator<Item = (String, MetricValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Serialize for GpuRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct GpuRecordVisitor;

impl<'de> Visitor<'de> for GpuRecordVisitor {
    type Value = GpuRecord;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of GPU field names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<GpuRecord, A::Error> {
        let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry::<String, MetricValue>()? {
            fields.push(entry);
        }
        Ok(GpuRecord { fields })
    }
}

impl<'de> Deserialize<'de> for GpuRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(GpuRecordVisitor)
    }
}

/// A process holding GPU memory. Values are passed through as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub gpu_bus_id: String,
    pub pid: String,
    pub process_name: String,
    pub used_memory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub timestamp: String,
    pub gpus: Vec<GpuRecord>,
    pub processes: Vec<ProcessRecord>,
}
