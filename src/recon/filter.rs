use std::f64::consts::TAU;

use crate::{Apodization, KSpace};

/// Window weights for one axis of length `n` in centred layout, peaked at
/// index `n/2`. Axes with a single sample are never weighted.
pub fn window(apodization: Apodization, n: usize) -> Vec<f64> {
    let (a, b) = match apodization {
        Apodization::None => return vec![1.0; n],
        Apodization::Hanning => (0.5, 0.5),
        Apodization::Hamming => (0.54, 0.46),
    };
    if n == 1 {
        return vec![1.0];
    }

    let centre = (n / 2) as f64;
    (0..n)
        .map(|i| a + b * (TAU * (i as f64 - centre) / n as f64).cos())
        .collect()
}

/// Multiply the separable window onto every sampled axis. Returns a new
/// buffer, `Apodization::None` returns an identical copy.
pub fn apodize(kspace: &KSpace, apodization: Apodization) -> KSpace {
    if apodization == Apodization::None {
        return kspace.clone();
    }

    let shape = kspace.shape();
    let [wx, wy, wz] = shape.dims().map(|n| window(apodization, n));
    let mut filtered = kspace.clone();
    for (index, value) in filtered.data_mut().iter_mut().enumerate() {
        let [x, y, z] = shape.coord(index);
        *value *= wx[x] * wy[y] * wz[z];
    }
    filtered
}
