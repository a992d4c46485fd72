use pulseq_rs::{Gradient, Rf};

use crate::util::{Rotation, Spin};

// Sequence files may be parsed in single precision, everything is widened to
// f64 before it touches the simulation.

/// Gradient moment of one channel over `[t_start, t_end]` (absolute times).
/// Unit: `1 / m` (`Hz / m * s`)
pub fn integrate_grad(
    grad: &Gradient,
    t_start: f64,
    t_end: f64,
    block_start: f64,
    grad_raster: f64,
) -> f64 {
    match grad {
        Gradient::Free { amp, delay, shape } => {
            let delay = *delay as f64;
            *amp as f64
                * integrate_free(
                    t_start - block_start - delay,
                    t_end - block_start - delay,
                    &shape.0,
                    grad_raster,
                )
        }
        Gradient::Trap {
            amp,
            rise,
            flat,
            fall,
            delay,
        } => {
            let delay = *delay as f64;
            *amp as f64
                * integrate_trap(
                    t_start - block_start - delay,
                    t_end - block_start - delay,
                    *rise as f64,
                    *flat as f64,
                    *fall as f64,
                )
        }
    }
}

/// Apply all RF samples inside `[t_start, t_end]` to `spin`.
pub fn integrate_rf(
    rf: &Rf,
    spin: &mut Spin,
    t_start: f64,
    t_end: f64,
    block_start: f64,
    rf_raster: f64,
) {
    for i in 0..rf.amp_shape.0.len() {
        let dwell = rf_raster;
        // Start time of the sample number i
        let t = block_start + rf.delay as f64 + i as f64 * dwell;

        // Skip samples before t_start, quit when reaching t_end
        if t + dwell < t_start {
            continue;
        }
        if t_end <= t {
            break;
        }

        // Clamping every sample accumulates errors over long pulses, only
        // the samples cut by the interval are clamped
        let dur = if t_start <= t && t + dwell <= t_end {
            dwell
        } else {
            let t0 = t.clamp(t_start, t_end);
            let t1 = (t + dwell).clamp(t_start, t_end);
            t1 - t0
        };

        *spin *= Rotation::new(
            rf.amp as f64 * rf.amp_shape.0[i] as f64 * dur * std::f64::consts::TAU,
            rf.phase as f64 + rf.phase_shape.0[i] as f64 * std::f64::consts::TAU,
        );
    }
}

/// Integral of a unit trapezoid starting at `t = 0`.
pub fn integrate_trap(t_start: f64, t_end: f64, rise: f64, flat: f64, fall: f64) -> f64 {
    let integral = |t| {
        if t <= rise {
            0.5 * t * t / rise
        } else if t <= rise + flat {
            (0.5 * rise) + (t - rise)
        } else {
            let rev_t = rise + flat + fall - t;
            (0.5 * rise) + flat + (0.5 * (fall - rev_t * rev_t / fall))
        }
    };
    let t_min = 0.0;
    let t_max = rise + flat + fall;
    // Only the interval ends are clamped, the closed form is exact in between
    integral(t_end.clamp(t_min, t_max)) - integral(t_start.clamp(t_min, t_max))
}

/// Integral of a piecewise constant waveform with samples of length `dwell`
/// starting at `t = 0`.
pub fn integrate_free<T>(t_start: f64, t_end: f64, samples: &[T], dwell: f64) -> f64
where
    T: Copy + Into<f64>,
{
    let mut integrated = 0.0;

    for (i, sample) in samples.iter().enumerate() {
        let t = i as f64 * dwell;

        if t + dwell <= t_start {
            continue;
        }
        if t_end <= t {
            break;
        }

        // Same as for RF: only the edge samples are clamped
        let dur = if t_start <= t && t + dwell <= t_end {
            dwell
        } else {
            let t0 = t.clamp(t_start, t_end);
            let t1 = (t + dwell).clamp(t_start, t_end);
            t1 - t0
        };

        integrated += (*sample).into() * dur;
    }

    integrated
}
