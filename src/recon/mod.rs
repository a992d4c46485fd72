//! Reconstruction: apodization, inverse FFT and module / phase extraction.
//! Every step is a pure function of its input, k-space buffers are never
//! modified.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::{Error, KSpace, ReconConfig, Shape, Volume};

mod fft;
mod filter;

pub use fft::{fftshift, ifftshift, Fft3d};
pub use filter::{apodize, window};

/// Reconstructed complex image in centred layout, the same shape as the
/// k-space it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Image(Volume<Complex64>);

impl Image {
    pub fn complex(&self) -> &Volume<Complex64> {
        &self.0
    }

    pub fn into_complex(self) -> Volume<Complex64> {
        self.0
    }

    /// Per voxel magnitude.
    pub fn module(&self) -> Volume<f64> {
        module(&self.0)
    }

    /// Per voxel argument in `(-pi, pi]`.
    pub fn phase(&self) -> Volume<f64> {
        phase(&self.0)
    }
}

pub fn module(volume: &Volume<Complex64>) -> Volume<f64> {
    volume.map(|z| z.norm())
}

pub fn phase(volume: &Volume<Complex64>) -> Volume<f64> {
    volume.map(|z| {
        // atan2 returns -pi for negative real parts with a negative zero
        // imaginary part
        let phi = z.arg();
        if phi <= -PI {
            PI
        } else {
            phi
        }
    })
}

/// Reconstruction pipeline planned for one k-space shape.
pub struct Pipeline {
    config: ReconConfig,
    fft: Fft3d,
}

impl Pipeline {
    pub fn new(shape: Shape, config: ReconConfig) -> Self {
        Self {
            config,
            fft: Fft3d::new(shape),
        }
    }

    pub fn shape(&self) -> Shape {
        self.fft.shape()
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Apply the configured apodization.
    pub fn filter(&self, kspace: &KSpace) -> Result<KSpace, Error> {
        self.check_shape(kspace)?;
        Ok(apodize(kspace, self.config.apodization))
    }

    /// Apodize and inverse transform into a centred complex image.
    pub fn run(&mut self, kspace: &KSpace) -> Result<Image, Error> {
        let filtered = self.filter(kspace)?;
        log::debug!(
            "Reconstructing {} k-space ({:?} apodization)",
            kspace.shape(),
            self.config.apodization
        );
        let image = self.fft.inverse_centred(filtered.as_volume())?;
        Ok(Image(image))
    }

    fn check_shape(&self, kspace: &KSpace) -> Result<(), Error> {
        if kspace.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape(),
                found: kspace.shape(),
            });
        }
        Ok(())
    }
}

/// One-shot reconstruction, plans the transform for the shape of `kspace`.
pub fn reconstruct(kspace: &KSpace, config: ReconConfig) -> Result<Image, Error> {
    Pipeline::new(kspace.shape(), config).run(kspace)
}
