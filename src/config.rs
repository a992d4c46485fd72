use crate::Error;

/// What happens if several acquisitions sample the same k-space coordinate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Accumulation {
    /// All samples are summed.
    #[default]
    Add,
    /// Only the last acquisition (in timeline order) at a coordinate counts.
    Overwrite,
}

/// Order of rotation and relaxation within one precession event. Both are
/// exact; they only differ in rounding, the choice is fixed for a whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    #[default]
    RotateThenDecay,
    DecayThenRotate,
}

/// Window multiplied onto k-space before the inverse transform.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Apodization {
    #[default]
    None,
    /// `0.5 + 0.5 cos`, reaches zero at the k-space border
    Hanning,
    /// `0.54 + 0.46 cos`
    Hamming,
}

/// Knobs of the magnetization kernel. None of them except `accumulation`,
/// `composition` and `t2_star_dephasing` change the result: partitions are
/// always reduced in the same order, whatever the number of workers.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub accumulation: Accumulation,
    pub composition: Composition,
    /// Use the tissue's T2* (where present) for transverse decay.
    pub t2_star_dephasing: bool,
    /// Number of threads simulating partitions.
    pub workers: usize,
    /// Number of isochromats per partition.
    pub partition_len: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            accumulation: Accumulation::default(),
            composition: Composition::default(),
            t2_star_dephasing: false,
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            partition_len: 4096,
        }
    }
}

impl SimConfig {
    pub fn accumulation(self, accumulation: Accumulation) -> Self {
        Self {
            accumulation,
            ..self
        }
    }

    pub fn composition(self, composition: Composition) -> Self {
        Self {
            composition,
            ..self
        }
    }

    pub fn t2_star_dephasing(self, t2_star_dephasing: bool) -> Self {
        Self {
            t2_star_dephasing,
            ..self
        }
    }

    pub fn workers(self, workers: usize) -> Self {
        Self { workers, ..self }
    }

    pub fn partition_len(self, partition_len: usize) -> Self {
        Self {
            partition_len,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.workers == 0 {
            return Err(Error::Config("at least one worker is required".into()));
        }
        if self.partition_len == 0 {
            return Err(Error::Config("partitions must not be empty".into()));
        }
        Ok(())
    }
}

/// Knobs of the reconstruction pipeline.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconConfig {
    pub apodization: Apodization,
}

impl ReconConfig {
    pub fn apodization(self, apodization: Apodization) -> Self {
        Self { apodization }
    }
}

#[cfg(test)]
mod tests {
    use super::{Accumulation, Apodization, ReconConfig, SimConfig};
    use assert2::check;

    #[test]
    fn defaults() {
        let config = SimConfig::default();
        check!(config.accumulation == Accumulation::Add);
        check!(config.workers >= 1);
        check!(config.validate().is_ok());
        check!(ReconConfig::default().apodization == Apodization::None);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        check!(SimConfig::default().workers(0).validate().is_err());
        check!(SimConfig::default().partition_len(0).validate().is_err());
    }
}
