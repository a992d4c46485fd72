use num_complex::Complex64;
use std::ops::MulAssign;

// Everything is double precision: a single isochromat may see millions of
// rotations and relaxation steps, single precision drifts visibly.

/// Magnetization vector `[mx, my, mz]` of one isochromat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin(pub [f64; 3]);

impl Spin {
    // relaxed, angle and phase measure the RF pulses of imported sequences

    /// Unit magnetization along +z.
    #[cfg(any(feature = "pulseq", test))]
    pub fn relaxed() -> Self {
        Self([0.0, 0.0, 1.0])
    }

    /// Thermal equilibrium for proton density `m0`.
    pub fn equilibrium(m0: f64) -> Self {
        Self([0.0, 0.0, m0])
    }

    /// Flip angle relative to +z of a spin that started relaxed.
    #[cfg(any(feature = "pulseq", test))]
    pub fn angle(&self) -> f64 {
        // Normalize because error can build up during rotations
        (self.0[2] / self.norm()).acos()
    }

    #[cfg(any(feature = "pulseq", test))]
    pub fn phase(&self) -> f64 {
        // We want the phase of the applied rotation, not of the spin itself
        let tmp = f64::atan2(self.0[1], self.0[0]) + std::f64::consts::FRAC_PI_2;
        // Map to the range [0, 2*pi]
        if tmp < 0.0 {
            tmp + std::f64::consts::TAU
        } else {
            tmp
        }
    }

    /// `mx + i*my`
    pub fn transverse(&self) -> Complex64 {
        Complex64::new(self.0[0], self.0[1])
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|m| m.is_finite())
    }

    /// Clockwise rotation about z: `m_xy <- m_xy * exp(-i*phi)`.
    pub fn precess(&mut self, phi: f64) {
        if phi == 0.0 {
            return;
        }
        let (sin, cos) = phi.sin_cos();
        let [x, y, z] = self.0;
        self.0 = [x * cos + y * sin, y * cos - x * sin, z];
    }

    /// Apply the relaxation factors `e1`, `e2` towards equilibrium `m0`.
    pub fn relax(&mut self, e1: f64, e2: f64, m0: f64) {
        let [x, y, z] = self.0;
        self.0 = [x * e2, y * e2, m0 + (z - m0) * e1];
    }

    #[cfg(any(feature = "pulseq", test))]
    fn norm(&self) -> f64 {
        (self.0[0] * self.0[0] + self.0[1] * self.0[1] + self.0[2] * self.0[2]).sqrt()
    }
}

/// `exp(-duration / t)`, with a zero duration never relaxing and a zero time
/// constant relaxing completely (instead of producing `0 / 0`).
pub fn relaxation_factor(duration: f64, t: f64) -> f64 {
    if duration == 0.0 {
        1.0
    } else if t == 0.0 {
        0.0
    } else {
        (-duration / t).exp()
    }
}

/// RF rotation by `angle` around the transverse axis that lies at `phase`
/// from x.
pub struct Rotation([[f64; 3]; 3]);

impl Rotation {
    pub fn new(angle: f64, phase: f64) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        let (sin_p, cos_p) = phase.sin_cos();
        Self([
            [
                cos_a * sin_p.powi(2) + cos_p.powi(2),
                (1.0 - cos_a) * sin_p * cos_p,
                sin_a * sin_p,
            ],
            [
                (1.0 - cos_a) * sin_p * cos_p,
                cos_a * cos_p.powi(2) + sin_p.powi(2),
                -sin_a * cos_p,
            ],
            [-sin_a * sin_p, sin_a * cos_p, cos_a],
        ])
    }
}

impl MulAssign<Rotation> for Spin {
    fn mul_assign(&mut self, rhs: Rotation) {
        let x = rhs.0[0][0] * self.0[0] + rhs.0[0][1] * self.0[1] + rhs.0[0][2] * self.0[2];
        let y = rhs.0[1][0] * self.0[0] + rhs.0[1][1] * self.0[1] + rhs.0[1][2] * self.0[2];
        let z = rhs.0[2][0] * self.0[0] + rhs.0[2][1] * self.0[1] + rhs.0[2][2] * self.0[2];
        self.0 = [x, y, z];
    }
}
