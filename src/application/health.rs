use crate::domain::{NetworkCounters, ResourceSample};

/// One measurement ready to be rendered into a report fragment
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEntry {
    DiskSize {
        size: u64,
    },
    MemoryUsage {
        description: String,
        sample: ResourceSample,
    },
    Network {
        description: String,
        counters: NetworkCounters,
    },
}

impl AnalysisEntry {
    pub fn analysis_type(&self) -> &'static str {
        match self {
            Self::DiskSize { .. } => "diskSize",
            Self::MemoryUsage { .. } => "memoryUsage",
            Self::Network { .. } => "Network",
        }
    }
}

/// Producer of one report fragment, registered with the report under a key
pub trait HealthItemProducer {
    fn produce(&self) -> AnalysisEntry;
}

pub struct BinarySizeItem {
    size: u64,
}

impl BinarySizeItem {
    pub fn new(size: u64) -> Self {
        Self { size }
    }
}

impl HealthItemProducer for BinarySizeItem {
    fn produce(&self) -> AnalysisEntry {
        AnalysisEntry::DiskSize { size: self.size }
    }
}

pub struct MemoryUsageItem {
    description: String,
    sample: ResourceSample,
}

impl MemoryUsageItem {
    pub fn new(description: impl Into<String>, sample: ResourceSample) -> Self {
        Self {
            description: description.into(),
            sample,
        }
    }
}

impl HealthItemProducer for MemoryUsageItem {
    fn produce(&self) -> AnalysisEntry {
        AnalysisEntry::MemoryUsage {
            description: self.description.clone(),
            sample: self.sample.clone(),
        }
    }
}

pub struct NetworkUsageItem {
    description: String,
    counters: NetworkCounters,
}

impl NetworkUsageItem {
    pub fn new(description: impl Into<String>, counters: NetworkCounters) -> Self {
        Self {
            description: description.into(),
            counters,
        }
    }
}

impl HealthItemProducer for NetworkUsageItem {
    fn produce(&self) -> AnalysisEntry {
        AnalysisEntry::Network {
            description: self.description.clone(),
            counters: self.counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CpuLoad;

    #[test]
    fn test_producers_yield_their_entry() {
        let sample = ResourceSample::new(4, 2048000, 12, CpuLoad::Measured(12.5));
        let memory = MemoryUsageItem::new("Average", sample.clone()).produce();
        assert_eq!(memory.analysis_type(), "memoryUsage");
        assert_eq!(
            memory,
            AnalysisEntry::MemoryUsage {
                description: "Average".to_string(),
                sample
            }
        );

        assert_eq!(BinarySizeItem::new(2048).produce(), AnalysisEntry::DiskSize { size: 2048 });

        let net = NetworkUsageItem::new("telemetry", NetworkCounters::new(1, 2, 3, 4)).produce();
        assert_eq!(net.analysis_type(), "Network");
    }
}
