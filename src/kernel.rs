//! Bloch integration of every isochromat through a timeline.
//!
//! Conventions (fixed for every run):
//! - RF pulses are hard pulses, rotating right-handed about the axis at
//!   `phase` from x: 90 deg at phase 0 takes +z to -y.
//! - Precession and gradients rotate clockwise: `m_xy <- m_xy * exp(-i*phi)`
//!   with `phi = 2*pi*f*t`, so the acquired signal is the forward Fourier
//!   transform of the object and the inverse FFT reconstructs it.
//! - Relaxation only happens in precession events, gradients only dephase.
//!   Both are z-rotations / scalings that commute, so a gradient and a
//!   precession over the same interval are exact.
//!
//! The isochromat population is cut into partitions of fixed length, each one
//! simulated into its own partial k-space. Partials are merged strictly in
//! partition order, which makes the result independent of the worker count.

use std::f64::consts::TAU;
use std::panic::AssertUnwindSafe;

use num_complex::Complex64;
use rayon::prelude::*;

use crate::util::{relaxation_factor, Rotation, Spin};
use crate::{
    Accumulation, Composition, Error, EventKind, FieldMap, Isochromat, KSpace, ObjectModel,
    Sequence, Shape, SimConfig, Timeline, Uniform,
};

/// Timeline events reduced to what the per-isochromat loop needs.
#[derive(Debug, Clone, Copy)]
enum Step {
    Rf { flip_angle: f64, phase: f64 },
    /// Phase per metre of position: `2*pi*G*duration`. Unit: `rad / m`
    Gradient { moment: [f64; 3] },
    Precession { duration: f64 },
    Acquisition { index: usize, demodulation: Complex64 },
    /// Acquisition overwritten by a later one at the same coordinate
    Skip,
}

fn compile(timeline: &Timeline, shape: Shape, accumulation: Accumulation) -> Vec<Step> {
    let mut steps: Vec<Step> = timeline
        .events()
        .iter()
        .map(|event| match event.kind {
            EventKind::Rf { flip_angle, phase } => Step::Rf { flip_angle, phase },
            EventKind::Gradient { amplitude } => Step::Gradient {
                moment: amplitude.map(|g| TAU * g * event.duration),
            },
            EventKind::Precession => Step::Precession {
                duration: event.duration,
            },
            EventKind::Acquisition { coord, phase } => match shape.index(coord) {
                Some(index) => Step::Acquisition {
                    index,
                    demodulation: Complex64::from_polar(1.0, -phase),
                },
                // Unreachable for validated timelines
                None => Step::Skip,
            },
        })
        .collect();

    if accumulation == Accumulation::Overwrite {
        let mut seen = vec![false; shape.len()];
        let mut skipped = 0;
        for step in steps.iter_mut().rev() {
            if let Step::Acquisition { index, .. } = *step {
                if seen[index] {
                    *step = Step::Skip;
                    skipped += 1;
                }
                seen[index] = true;
            }
        }
        if skipped > 0 {
            log::debug!("{skipped} acquisitions are overwritten by later ones");
        }
    }

    steps
}

/// The magnetization simulation kernel: configuration plus the (optional)
/// transmit and receive field maps.
pub struct Kernel {
    config: SimConfig,
    transmit: Box<dyn FieldMap>,
    receive: Box<dyn FieldMap>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Kernel {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            transmit: Box::new(Uniform),
            receive: Box::new(Uniform),
        }
    }

    pub fn with_transmit(self, map: impl FieldMap + 'static) -> Self {
        Self {
            transmit: Box::new(map),
            ..self
        }
    }

    pub fn with_receive(self, map: impl FieldMap + 'static) -> Self {
        Self {
            receive: Box::new(map),
            ..self
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Build the timeline of `sequence` and simulate `object` with it.
    pub fn simulate_sequence(
        &self,
        object: &ObjectModel,
        sequence: &dyn Sequence,
    ) -> Result<KSpace, Error> {
        let timeline = sequence.timeline()?;
        self.simulate(object, &timeline, sequence.kspace_shape())
    }

    /// Simulate every isochromat of `object` and return the k-space of
    /// `shape` filled by the timeline's acquisitions.
    pub fn simulate(
        &self,
        object: &ObjectModel,
        timeline: &Timeline,
        shape: Shape,
    ) -> Result<KSpace, Error> {
        self.simulate_isochromats(&object.isochromats(), timeline, shape)
    }

    /// Like `simulate`, for an explicit isochromat population.
    /// Configuration and timeline are validated before any work starts.
    pub fn simulate_isochromats(
        &self,
        isochromats: &[Isochromat],
        timeline: &Timeline,
        shape: Shape,
    ) -> Result<KSpace, Error> {
        self.config.validate()?;
        timeline.validate(shape)?;
        let steps = compile(timeline, shape, self.config.accumulation);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|err| Error::Config(format!("cannot start worker pool: {err}")))?;

        let partitions: Vec<&[Isochromat]> =
            isochromats.chunks(self.config.partition_len).collect();
        log::info!(
            "Simulating {} isochromats through {} events into {shape} k-space ({} partitions, {} workers)",
            isochromats.len(),
            timeline.len(),
            partitions.len(),
            self.config.workers
        );
        let start = std::time::Instant::now();

        // Waves bound the number of partial buffers alive at the same time,
        // the merge order is the partition order regardless
        let mut kspace = KSpace::zeros(shape);
        for (wave_index, wave) in partitions.chunks(self.config.workers).enumerate() {
            let first = wave_index * self.config.workers;
            let partials: Vec<Result<KSpace, Error>> = pool.install(|| {
                wave.par_iter()
                    .enumerate()
                    .map(|(i, isochromats)| {
                        self.run_partition(first + i, isochromats, &steps, shape)
                    })
                    .collect()
            });
            for partial in partials {
                kspace.merge(&partial?)?;
            }
            log::debug!(
                "Merged partitions {first}..{} of {}",
                first + wave.len(),
                partitions.len()
            );
        }

        log::info!(
            "Simulation finished in {:.3} s",
            start.elapsed().as_secs_f64()
        );
        Ok(kspace)
    }

    /// Simulate one partition into a fresh partial k-space. A panic inside
    /// the partition (e.g. in a user supplied field map) fails the run.
    fn run_partition(
        &self,
        partition: usize,
        isochromats: &[Isochromat],
        steps: &[Step],
        shape: Shape,
    ) -> Result<KSpace, Error> {
        let offset = partition * self.config.partition_len;
        std::panic::catch_unwind(AssertUnwindSafe(|| {
            let mut kspace = KSpace::zeros(shape);
            for (i, isochromat) in isochromats.iter().enumerate() {
                self.run_isochromat(offset + i, isochromat, steps, &mut kspace)?;
            }
            Ok(kspace)
        }))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            log::error!("Partition #{partition} panicked: {message}");
            Err(Error::WorkerFailed { partition, message })
        })
    }

    fn run_isochromat(
        &self,
        index: usize,
        isochromat: &Isochromat,
        steps: &[Step],
        kspace: &mut KSpace,
    ) -> Result<(), Error> {
        check_tissue(index, isochromat)?;
        let Isochromat { position, tissue } = *isochromat;
        let m0 = tissue.proton_density;
        let t2 = match tissue.t2_star {
            Some(t2_star) if self.config.t2_star_dephasing => t2_star,
            _ => tissue.t2,
        };
        let omega = TAU * tissue.off_resonance();
        let (tx_scale, tx_phase) = self.transmit.gain(position).to_polar();
        let rx = self.receive.gain(position);

        let mut spin = Spin::equilibrium(m0);
        for (event, step) in steps.iter().enumerate() {
            match *step {
                Step::Rf { flip_angle, phase } => {
                    spin *= Rotation::new(flip_angle * tx_scale, phase + tx_phase);
                }
                Step::Gradient { moment } => {
                    spin.precess(
                        moment[0] * position[0] + moment[1] * position[1] + moment[2] * position[2],
                    );
                }
                Step::Precession { duration } => {
                    let phi = omega * duration;
                    let e1 = relaxation_factor(duration, tissue.t1);
                    let e2 = relaxation_factor(duration, t2);
                    match self.config.composition {
                        Composition::RotateThenDecay => {
                            spin.precess(phi);
                            spin.relax(e1, e2, m0);
                        }
                        Composition::DecayThenRotate => {
                            spin.relax(e1, e2, m0);
                            spin.precess(phi);
                        }
                    }
                }
                Step::Acquisition {
                    index: sample,
                    demodulation,
                } => {
                    let signal = rx * spin.transverse() * demodulation;
                    if !signal.is_finite() {
                        return Err(non_finite(index, isochromat, event, &spin));
                    }
                    kspace.add(sample, signal);
                }
                Step::Skip => (),
            }

            if !spin.is_finite() {
                return Err(non_finite(index, isochromat, event, &spin));
            }
        }
        Ok(())
    }
}

/// Time constants may be zero (immediate decay) or infinite (no decay), but
/// never negative: that would grow the magnetization without bound.
fn check_tissue(index: usize, isochromat: &Isochromat) -> Result<(), Error> {
    let tissue = &isochromat.tissue;
    let invalid = |reason: String| {
        Err(Error::InvalidTissue {
            isochromat: index,
            position: isochromat.position,
            reason,
        })
    };

    let times = [("T1", Some(tissue.t1)), ("T2", Some(tissue.t2)), ("T2*", tissue.t2_star)];
    for (name, t) in times {
        match t {
            Some(t) if t.is_nan() || t < 0.0 => {
                return invalid(format!("{name} must be a non-negative time, got {t}"))
            }
            _ => (),
        }
    }
    let values = [
        ("proton density", tissue.proton_density),
        ("chemical shift", tissue.chemical_shift),
        ("delta B0", tissue.delta_b0),
    ];
    for (name, value) in values {
        if !value.is_finite() {
            return invalid(format!("{name} must be finite, got {value}"));
        }
    }
    if isochromat.position.iter().any(|x| !x.is_finite()) {
        return invalid("position must be finite".to_owned());
    }
    Ok(())
}

fn non_finite(index: usize, isochromat: &Isochromat, event: usize, spin: &Spin) -> Error {
    Error::NonFinite {
        isochromat: index,
        position: isochromat.position,
        event,
        magnetization: spin.0,
    }
}
