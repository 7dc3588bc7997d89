use std::sync::Arc;

use smiserve_core::{MetricsCollector, NvidiaSmi, SmiConfig, SmiExecutor};
use tracing::info;

pub type Collector = MetricsCollector<Box<dyn SmiExecutor>>;

pub struct AppState {
    pub collector: Arc<Collector>,
}

impl AppState {
    pub fn new(config: &SmiConfig) -> Self {
        let smi = NvidiaSmi::new(config);
        info!("Querying GPUs with {}", smi.binary());
        Self::with_executor(Box::new(smi))
    }

    pub fn with_executor(executor: Box<dyn SmiExecutor>) -> Self {
        Self {
            collector: Arc::new(MetricsCollector::new(executor)),
        }
    }
}
