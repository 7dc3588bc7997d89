//! Static catalog of the nvidia-smi fields this crate queries.
//!
//! Field order here is both the query order and the key order of every
//! [`GpuRecord`](crate::GpuRecord). To expose a new metric, append it to the
//! right group below.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldGroup {
    /// Supported by practically every GPU and driver.
    Core,
    /// Depends on the GPU model or driver version.
    Optional,
}

impl FieldGroup {
    pub fn label(&self) -> &'static str {
        match self {
            FieldGroup::Core => "core",
            FieldGroup::Optional => "optional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub group: FieldGroup,
}

const fn core_field(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        group: FieldGroup::Core,
    }
}

const fn optional_field(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        group: FieldGroup::Optional,
    }
}

static CATALOG: &[FieldSpec] = &[
    core_field("index"),
    core_field("name"),
    core_field("uuid"),
    core_field("driver_version"),
    core_field("pci.bus_id"),
    core_field("temperature.gpu"),
    core_field("utilization.gpu"),
    core_field("utilization.memory"),
    core_field("memory.total"),
    core_field("memory.used"),
    core_field("memory.free"),
    core_field("power.draw"),
    core_field("power.limit"),
    core_field("clocks.current.graphics"),
    core_field("clocks.current.memory"),
    core_field("compute_mode"),
    core_field("display_active"),
    core_field("pcie.link.gen.current"),
    core_field("pcie.link.gen.max"),
    core_field("pcie.link.width.current"),
    core_field("pcie.link.width.max"),
    optional_field("fan.speed"),
    optional_field("utilization.encoder"),
    optional_field("utilization.decoder"),
    optional_field("clocks.current.sm"),
    optional_field("clocks.current.video"),
    optional_field("clocks.max.graphics"),
    optional_field("clocks.max.memory"),
    optional_field("power.default_limit"),
    optional_field("power.min_limit"),
    optional_field("power.max_limit"),
    optional_field("temperature.memory"),
    optional_field("pci.domain"),
    optional_field("pci.bus"),
    optional_field("pci.device"),
    optional_field("pci.device_id"),
    optional_field("pci.sub_device_id"),
    optional_field("persistence_mode"),
    optional_field("ecc.mode.current"),
];

/// Columns requested from `--query-compute-apps`, in output order.
pub const PROCESS_FIELDS: [&str; 4] = ["gpu_bus_id", "pid", "process_name", "used_memory"];

pub fn catalog() -> &'static [FieldSpec] {
    CATALOG
}

fn group_fields(group: FieldGroup) -> Vec<&'static str> {
    CATALOG
        .iter()
        .filter(|spec| spec.group == group)
        .map(|spec| spec.name)
        .collect()
}

pub fn core_fields() -> Vec<&'static str> {
    group_fields(FieldGroup::Core)
}

pub fn optional_fields() -> Vec<&'static str> {
    group_fields(FieldGroup::Optional)
}

/// Core fields followed by optional fields.
pub fn full_fields() -> Vec<&'static str> {
    let mut fields = core_fields();
    fields.extend(optional_fields());
    fields
}
