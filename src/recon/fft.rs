//! 3D FFT using rustfft, for any axis length.
//!
//! Data is stored x fastest (`x + y*nx + z*nx*ny`). The transforms work on
//! natural order (zero frequency at index 0); `fftshift` / `ifftshift` convert
//! from and to the centred layout used by k-space buffers and images
//! (numpy's convention, zero frequency at index `n/2`).

use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

use crate::{Error, Shape, Volume};

/// Cached plans and scratch buffers for one shape.
pub struct Fft3d {
    shape: Shape,
    forward: [Arc<dyn Fft<f64>>; 3],
    inverse: [Arc<dyn Fft<f64>>; 3],
    scratch: Vec<Complex64>,
    line: Vec<Complex64>,
}

impl Fft3d {
    pub fn new(shape: Shape) -> Self {
        let mut planner = FftPlanner::new();
        let dims = shape.dims();
        let forward = dims.map(|n| planner.plan_fft(n, FftDirection::Forward));
        let inverse = dims.map(|n| planner.plan_fft(n, FftDirection::Inverse));

        let scratch_len = forward
            .iter()
            .chain(inverse.iter())
            .map(|fft| fft.get_inplace_scratch_len())
            .max()
            .unwrap_or(0);

        Self {
            shape,
            forward,
            inverse,
            scratch: vec![Complex64::new(0.0, 0.0); scratch_len],
            line: vec![Complex64::new(0.0, 0.0); dims.into_iter().max().unwrap_or(1)],
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// In-place unnormalized forward FFT in natural order.
    pub fn forward(&mut self, data: &mut [Complex64]) -> Result<(), Error> {
        self.check_len(data)?;
        for axis in 0..3 {
            let fft = Arc::clone(&self.forward[axis]);
            self.transform_axis(data, axis, &*fft);
        }
        Ok(())
    }

    /// In-place inverse FFT in natural order, normalized by `1 / N`.
    pub fn inverse(&mut self, data: &mut [Complex64]) -> Result<(), Error> {
        self.check_len(data)?;
        for axis in 0..3 {
            let fft = Arc::clone(&self.inverse[axis]);
            self.transform_axis(data, axis, &*fft);
        }

        let n_total = self.shape.len() as f64;
        for val in data.iter_mut() {
            *val /= n_total;
        }
        Ok(())
    }

    /// Forward transform of a centred image into centred k-space. The
    /// counterpart of what the reconstruction pipeline inverts.
    pub fn forward_centred(
        &mut self,
        image: &Volume<Complex64>,
    ) -> Result<Volume<Complex64>, Error> {
        let mut data = ifftshift(image.data(), image.shape());
        self.forward(&mut data)?;
        Volume::from_vec(image.shape(), fftshift(&data, image.shape()))
    }

    /// Inverse transform of centred k-space into a centred image.
    pub fn inverse_centred(
        &mut self,
        kspace: &Volume<Complex64>,
    ) -> Result<Volume<Complex64>, Error> {
        let mut data = ifftshift(kspace.data(), kspace.shape());
        self.inverse(&mut data)?;
        Volume::from_vec(kspace.shape(), fftshift(&data, kspace.shape()))
    }

    fn check_len(&self, data: &[Complex64]) -> Result<(), Error> {
        if data.len() != self.shape.len() {
            return Err(Error::LengthMismatch {
                shape: self.shape,
                len: data.len(),
            });
        }
        Ok(())
    }

    fn transform_axis(&mut self, data: &mut [Complex64], axis: usize, fft: &dyn Fft<f64>) {
        let [nx, ny, nz] = self.shape.dims();
        let n = self.shape.dims()[axis];
        if n == 1 {
            return;
        }

        // x lines are contiguous and transformed in place
        if axis == 0 {
            for line in data.chunks_exact_mut(nx) {
                fft.process_with_scratch(line, &mut self.scratch);
            }
            return;
        }

        let (stride, outer): (usize, Vec<usize>) = if axis == 1 {
            (
                nx,
                (0..nz)
                    .flat_map(|k| (0..nx).map(move |i| i + k * nx * ny))
                    .collect(),
            )
        } else {
            (nx * ny, (0..nx * ny).collect())
        };

        let line = &mut self.line[..n];
        for start in outer {
            for (j, val) in line.iter_mut().enumerate() {
                *val = data[start + j * stride];
            }
            fft.process_with_scratch(line, &mut self.scratch);
            for (j, val) in line.iter().enumerate() {
                data[start + j * stride] = *val;
            }
        }
    }
}

/// Natural to centred order: zero frequency moves to index `n/2`.
pub fn fftshift<T: Copy + Default>(data: &[T], shape: Shape) -> Vec<T> {
    let dims = shape.dims();
    shift(data, shape, dims.map(|n| n / 2))
}

/// Centred to natural order, the inverse of `fftshift` for every length.
pub fn ifftshift<T: Copy + Default>(data: &[T], shape: Shape) -> Vec<T> {
    let dims = shape.dims();
    shift(data, shape, dims.map(|n| (n + 1) / 2))
}

fn shift<T: Copy + Default>(data: &[T], shape: Shape, offset: [usize; 3]) -> Vec<T> {
    let [nx, ny, nz] = shape.dims();
    let mut out = vec![T::default(); data.len()];

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let si = (i + offset[0]) % nx;
                let sj = (j + offset[1]) % ny;
                let sk = (k + offset[2]) % nz;
                out[si + sj * nx + sk * nx * ny] = data[i + j * nx + k * nx * ny];
            }
        }
    }

    out
}
