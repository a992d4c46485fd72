use std::fmt::Display;

use crate::Error;

/// Extent of a dense 3D array. 1D and 2D data use trailing axes of size 1.
/// Data is stored with x running fastest: `x + y*nx + z*nx*ny`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape([usize; 3]);

impl Shape {
    /// Returns an error if any axis is empty.
    pub fn new(dims: [usize; 3]) -> Result<Self, Error> {
        if dims.iter().any(|&n| n == 0) {
            return Err(Error::EmptyShape(dims));
        }
        Ok(Self(dims))
    }

    pub fn dims(&self) -> [usize; 3] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.iter().product()
    }

    /// Number of axes with more than one sample.
    pub fn ndim(&self) -> usize {
        self.0.iter().filter(|&&n| n > 1).count()
    }

    pub fn contains(&self, coord: [usize; 3]) -> bool {
        coord.iter().zip(self.0).all(|(&c, n)| c < n)
    }

    /// Linear index of `coord`, `None` if it lies outside.
    pub fn index(&self, coord: [usize; 3]) -> Option<usize> {
        let [nx, ny, _] = self.0;
        self.contains(coord)
            .then(|| coord[0] + coord[1] * nx + coord[2] * nx * ny)
    }

    /// Inverse of `index`.
    pub fn coord(&self, index: usize) -> [usize; 3] {
        let [nx, ny, _] = self.0;
        [index % nx, (index / nx) % ny, index / (nx * ny)]
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [nx, ny, nz] = self.0;
        write!(f, "{nx}x{ny}x{nz}")
    }
}

/// Dense array over a `Shape`. Reconstruction outputs (module, phase and the
/// complex image) are handed out as volumes and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: Clone + Default> Volume<T> {
    pub fn zeros(shape: Shape) -> Self {
        Self {
            shape,
            data: vec![T::default(); shape.len()],
        }
    }
}

impl<T> Volume<T> {
    /// Wrap existing data, which must hold exactly `shape.len()` values.
    pub fn from_vec(shape: Shape, data: Vec<T>) -> Result<Self, Error> {
        if data.len() != shape.len() {
            return Err(Error::LengthMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, coord: [usize; 3]) -> Option<&T> {
        self.shape.index(coord).map(|i| &self.data[i])
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Volume<U> {
        Volume {
            shape: self.shape,
            data: self.data.iter().map(f).collect(),
        }
    }
}
