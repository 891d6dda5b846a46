use burn::data::dataset::Dataset;

use crate::domain::sample::VolumeSample;

/// In-memory dataset of materialized volume samples, as produced
/// by `DataManager::data`.
pub struct VolumeDataset {
    samples: Vec<VolumeSample>,
}

impl VolumeDataset {
    pub fn new(samples: Vec<VolumeSample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Edge lengths (target, low-res) of the samples; every sample
    /// in one dataset shares them.
    pub fn edges(&self) -> Option<(usize, usize)> {
        self.samples
            .first()
            .map(|s| (s.target.edge(), s.low_res.edge()))
    }
}

impl Dataset<VolumeSample> for VolumeDataset {
    fn get(&self, index: usize) -> Option<VolumeSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
