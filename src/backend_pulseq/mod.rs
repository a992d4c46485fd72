//! Timeline import from pulseq `.seq` files.
//!
//! Every block is cut at the centre of its RF pulse and at its ADC sample
//! times. The RF pulse is integrated into one hard pulse applied at its
//! centre, the gradients are integrated per segment into gradient events with
//! a precession event over the same interval, and every ADC sample becomes an
//! acquisition. ADC blocks are treated as Cartesian readout lines: sample `i`
//! of the `line`-th ADC block lands at `[i, line % ny, line / ny]`.

use std::path::Path;

use pulseq_rs::Gradient;

use crate::util::Spin;
use crate::{Error, Event, EventKind, Sequence, Shape, TimelineBuilder};

mod helpers;

pub struct PulseqSequence {
    seq: pulseq_rs::Sequence,
    shape: Shape,
}

/// Points where a block is cut into segments.
enum Cut {
    Pulse { angle: f64, phase: f64 },
    Sample { coord: [usize; 3], phase: f64 },
}

impl PulseqSequence {
    /// Load a sequence whose ADC samples fill a k-space of `shape`.
    pub fn load<P: AsRef<Path>>(path: P, shape: Shape) -> Result<Self, Error> {
        let seq = pulseq_rs::Sequence::from_file(path)
            .map_err(|err| Error::Import(format!("{err:?}")))?;
        log::info!("Loaded pulseq sequence with {} blocks", seq.blocks.len());
        Ok(Self { seq, shape })
    }

    pub fn duration(&self) -> f64 {
        self.seq.blocks.iter().map(|b| b.duration as f64).sum()
    }
}

/// Emit gradient and precession events over `[t_start, t_end]` and return
/// the end of the emitted interval. `moment` gives the gradient moment of
/// each channel over an interval.
fn segment(
    timeline: &mut TimelineBuilder,
    moment: &impl Fn(f64, f64) -> [f64; 3],
    t_start: f64,
    t_end: f64,
) -> f64 {
    let duration = t_end - t_start;
    if duration <= 0.0 {
        return t_start;
    }

    let amplitude = moment(t_start, t_end).map(|m| m / duration);
    if amplitude.iter().any(|&g| g != 0.0) {
        timeline.push(Event {
            start: t_start,
            duration,
            kind: EventKind::Gradient { amplitude },
        });
    }
    timeline.push(Event {
        start: t_start,
        duration,
        kind: EventKind::Precession,
    });
    // Not always t_end: the sum can round up, later events must not start
    // inside this interval
    t_start + duration
}

/// Emit the events of one block spanning `[block_start, block_end]`, cut at
/// the given RF centres and ADC sample times.
fn emit_block(
    timeline: &mut TimelineBuilder,
    block_start: f64,
    block_end: f64,
    mut cuts: Vec<(f64, Cut)>,
    moment: impl Fn(f64, f64) -> [f64; 3],
) {
    // Stable: a pulse and a sample at the same time keep their order and are
    // reported as overlapping by validation
    cuts.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut t = block_start;
    for (t_cut, cut) in cuts {
        t = segment(timeline, &moment, t, t_cut).max(t_cut);

        let kind = match cut {
            Cut::Pulse { angle, phase } => EventKind::Rf {
                flip_angle: angle,
                phase,
            },
            Cut::Sample { coord, phase } => EventKind::Acquisition { coord, phase },
        };
        timeline.push(Event {
            start: t,
            duration: 0.0,
            kind,
        });
    }
    segment(timeline, &moment, t, block_end);
}

impl Sequence for PulseqSequence {
    fn kspace_shape(&self) -> Shape {
        self.shape
    }

    fn emit(&self, timeline: &mut TimelineBuilder) -> Result<(), Error> {
        let [_, ny, _] = self.shape.dims();
        let mut line = 0;

        for block in &self.seq.blocks {
            let mut cuts = Vec::new();

            let grads = [block.gx.as_deref(), block.gy.as_deref(), block.gz.as_deref()];
            let grad_raster = self.seq.time_raster.grad as f64;
            let block_start = block.t_start as f64;
            let block_end = block_start + block.duration as f64;

            if let Some(rf) = &block.rf {
                let raster = self.seq.time_raster.rf;
                let rf_start = block_start + rf.delay as f64;
                let rf_end = rf_start + rf.duration(raster) as f64;

                let mut spin = Spin::relaxed();
                helpers::integrate_rf(rf, &mut spin, rf_start, rf_end, block_start, raster as f64);
                cuts.push((
                    (rf_start + rf_end) / 2.0,
                    Cut::Pulse {
                        angle: spin.angle(),
                        phase: spin.phase(),
                    },
                ));
            }

            if let Some(adc) = &block.adc {
                for i in 0..adc.num as usize {
                    cuts.push((
                        block_start + adc.delay as f64 + (i as f64 + 0.5) * adc.dwell as f64,
                        Cut::Sample {
                            coord: [i, line % ny, line / ny],
                            phase: adc.phase as f64,
                        },
                    ));
                }
                line += 1;
            }

            let moment = |t_start: f64, t_end: f64| {
                grads.map(|grad| {
                    grad.map_or(0.0, |grad| {
                        helpers::integrate_grad(grad, t_start, t_end, block_start, grad_raster)
                    })
                })
            };
            emit_block(timeline, block_start, block_end, cuts, moment);
        }

        log::debug!("Imported {line} ADC lines");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{emit_block, Cut};
    use crate::{EventKind, Shape, TimelineBuilder};
    use assert2::{check, let_assert};

    fn kinds(timeline: &TimelineBuilder) -> Vec<(f64, f64, &'static str)> {
        timeline
            .events()
            .iter()
            .map(|event| {
                let name = match event.kind {
                    EventKind::Rf { .. } => "rf",
                    EventKind::Gradient { .. } => "gradient",
                    EventKind::Precession => "precession",
                    EventKind::Acquisition { .. } => "acquisition",
                };
                (event.start, event.duration, name)
            })
            .collect()
    }

    #[test]
    fn block_is_cut_at_pulse_and_samples() {
        let mut timeline = TimelineBuilder::new();
        let cuts = vec![
            (
                7.0,
                Cut::Sample {
                    coord: [1, 0, 0],
                    phase: 0.0,
                },
            ),
            (
                2.0,
                Cut::Pulse {
                    angle: 1.0,
                    phase: 0.5,
                },
            ),
            (
                5.0,
                Cut::Sample {
                    coord: [0, 0, 0],
                    phase: 0.0,
                },
            ),
        ];
        // Constant 100 Hz/m on x
        emit_block(&mut timeline, 0.0, 10.0, cuts, |a, b| [100.0 * (b - a), 0.0, 0.0]);

        check!(
            kinds(&timeline)
                == vec![
                    (0.0, 2.0, "gradient"),
                    (0.0, 2.0, "precession"),
                    (2.0, 0.0, "rf"),
                    (2.0, 3.0, "gradient"),
                    (2.0, 3.0, "precession"),
                    (5.0, 0.0, "acquisition"),
                    (5.0, 2.0, "gradient"),
                    (5.0, 2.0, "precession"),
                    (7.0, 0.0, "acquisition"),
                    (7.0, 3.0, "gradient"),
                    (7.0, 3.0, "precession"),
                ]
        );
        for event in timeline.events() {
            if let EventKind::Gradient { amplitude } = event.kind {
                check!((amplitude[0] - 100.0).abs() < 1e-12);
            }
        }
        let_assert!(EventKind::Acquisition { coord, .. } = timeline.events()[5].kind);
        check!(coord == [0, 0, 0]);

        let timeline = timeline.build();
        check!(timeline.validate(Shape::new([2, 1, 1]).unwrap()).is_ok());
    }

    #[test]
    fn blocks_without_gradients_only_precess() {
        let mut timeline = TimelineBuilder::new();
        emit_block(&mut timeline, 1.0, 3.0, Vec::new(), |_, _| [0.0; 3]);
        check!(kinds(&timeline) == vec![(1.0, 2.0, "precession")]);
    }

    #[test]
    fn rounding_never_starts_a_sample_inside_a_segment() {
        for _ in 0..1000 {
            let start = rand::random::<f64>() * 10.0;
            let t_cut = start + rand::random::<f64>() * 1e-3;
            let mut timeline = TimelineBuilder::new();
            let cuts = vec![(
                t_cut,
                Cut::Sample {
                    coord: [0, 0, 0],
                    phase: 0.0,
                },
            )];
            emit_block(&mut timeline, start, t_cut + 1e-3, cuts, |a, b| {
                [1e3 * (b - a), 0.0, 0.0]
            });
            let timeline = timeline.build();
            check!(timeline.validate(Shape::new([1, 1, 1]).unwrap()).is_ok());
        }
    }
}
