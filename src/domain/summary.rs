use serde::Serialize;

use super::{CpuLoad, ResourceSample};

/// Minimum, maximum and average of every sample collected during one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    samples: u64,
    min: Option<ResourceSample>,
    max: Option<ResourceSample>,
    totals: Totals,
}

#[derive(Debug, Clone, Default, Serialize)]
struct Totals {
    threads: u64,
    memory: u64,
    virtual_memory: u64,
    handles: u64,
    cpu: f64,
    cpu_samples: u64,
}

/// Keep the smaller non-zero reading; zero means "not seen yet".
fn min_nonzero<T: PartialOrd + Default + Copy>(current: T, candidate: T) -> T {
    if current == T::default() || (candidate != T::default() && candidate < current) {
        candidate
    } else {
        current
    }
}

fn max_of<T: PartialOrd + Copy>(current: T, candidate: T) -> T {
    if candidate > current {
        candidate
    } else {
        current
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: &ResourceSample) {
        self.samples += 1;

        let min = self.min.get_or_insert_with(|| sample.clone());
        min.threads = min_nonzero(min.threads, sample.threads);
        min.memory_bytes = min_nonzero(min.memory_bytes, sample.memory_bytes);
        min.virtual_bytes = min_nonzero(min.virtual_bytes, sample.virtual_bytes);
        min.handles = min_nonzero(min.handles, sample.handles);
        min.cpu_load = match (min.cpu_load, sample.cpu_load) {
            (CpuLoad::Unknown, other) => other,
            (CpuLoad::Measured(a), CpuLoad::Measured(b)) => {
                CpuLoad::Measured(min_nonzero(a, b))
            }
            (current, CpuLoad::Unknown) => current,
        };

        let max = self.max.get_or_insert_with(|| sample.clone());
        max.threads = max_of(max.threads, sample.threads);
        max.memory_bytes = max_of(max.memory_bytes, sample.memory_bytes);
        max.virtual_bytes = max_of(max.virtual_bytes, sample.virtual_bytes);
        max.handles = max_of(max.handles, sample.handles);
        max.cpu_load = match (max.cpu_load, sample.cpu_load) {
            (CpuLoad::Measured(a), CpuLoad::Measured(b)) => CpuLoad::Measured(max_of(a, b)),
            (CpuLoad::Unknown, other) => other,
            (current, CpuLoad::Unknown) => current,
        };

        self.totals.threads += u64::from(sample.threads);
        self.totals.memory += sample.memory_bytes;
        self.totals.virtual_memory += sample.virtual_bytes;
        self.totals.handles += u64::from(sample.handles);
        if let Some(p) = sample.cpu_load.percent() {
            self.totals.cpu += p;
            self.totals.cpu_samples += 1;
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    pub fn minimum(&self) -> Option<&ResourceSample> {
        self.min.as_ref()
    }

    pub fn maximum(&self) -> Option<&ResourceSample> {
        self.max.as_ref()
    }

    pub fn average(&self) -> Option<ResourceSample> {
        if self.samples == 0 {
            return None;
        }
        let n = self.samples;
        let cpu_load = if self.totals.cpu_samples == 0 {
            CpuLoad::Unknown
        } else {
            CpuLoad::measured(self.totals.cpu / self.totals.cpu_samples as f64)
        };
        let binary_size = self.max.as_ref().map(|s| s.binary_size).unwrap_or(0);

        Some(
            ResourceSample::new(
                (self.totals.threads / n) as u32,
                self.totals.memory / n,
                (self.totals.handles / n) as u32,
                cpu_load,
            )
            .with_virtual(self.totals.virtual_memory / n)
            .with_binary_size(binary_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(threads: u32, memory: u64, handles: u32, cpu: CpuLoad) -> ResourceSample {
        ResourceSample::new(threads, memory, handles, cpu)
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::new();
        assert_eq!(summary.sample_count(), 0);
        assert!(summary.average().is_none());
        assert!(summary.minimum().is_none());
    }

    #[test]
    fn test_min_max_avg() {
        let mut summary = RunSummary::new();
        summary.record(&sample(2, 1000, 10, CpuLoad::Measured(10.0)));
        summary.record(&sample(6, 3000, 20, CpuLoad::Measured(30.0)));
        summary.record(&sample(4, 2000, 0, CpuLoad::Unknown));

        assert_eq!(summary.sample_count(), 3);

        let min = summary.minimum().unwrap();
        assert_eq!(min.threads, 2);
        assert_eq!(min.memory_bytes, 1000);
        // zero handle reading is ignored for the minimum
        assert_eq!(min.handles, 10);
        assert_eq!(min.cpu_load, CpuLoad::Measured(10.0));

        let max = summary.maximum().unwrap();
        assert_eq!(max.threads, 6);
        assert_eq!(max.memory_bytes, 3000);
        assert_eq!(max.handles, 20);
        assert_eq!(max.cpu_load, CpuLoad::Measured(30.0));

        let avg = summary.average().unwrap();
        assert_eq!(avg.threads, 4);
        assert_eq!(avg.memory_bytes, 2000);
        assert_eq!(avg.handles, 10);
        // unknown readings do not drag the cpu average down
        assert_eq!(avg.cpu_load, CpuLoad::Measured(20.0));
    }

    #[test]
    fn test_all_unknown_cpu_stays_unknown() {
        let mut summary = RunSummary::new();
        summary.record(&sample(1, 1, 1, CpuLoad::Unknown));
        assert_eq!(summary.average().unwrap().cpu_load, CpuLoad::Unknown);
        assert_eq!(summary.maximum().unwrap().cpu_load, CpuLoad::Unknown);
    }
}
