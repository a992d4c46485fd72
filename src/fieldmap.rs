use num_complex::Complex64;

use crate::{object, Error, ObjectModel, Shape, Volume};

/// Spatially varying coil sensitivity. For transmission the magnitude scales
/// the flip angle and the argument shifts the RF phase, for reception the
/// sampled signal is multiplied by the gain.
pub trait FieldMap: Send + Sync {
    fn gain(&self, position: [f64; 3]) -> Complex64;
}

/// Perfectly homogeneous coil, used when no map is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uniform;

impl FieldMap for Uniform {
    fn gain(&self, _position: [f64; 3]) -> Complex64 {
        Complex64::new(1.0, 0.0)
    }
}

impl<F> FieldMap for F
where
    F: Fn([f64; 3]) -> Complex64 + Send + Sync,
{
    fn gain(&self, position: [f64; 3]) -> Complex64 {
        self(position)
    }
}

/// Field map sampled on the voxel grid of an object, looked up by nearest
/// voxel. Positions outside of the grid get a gain of zero.
#[derive(Debug, Clone)]
pub struct GridFieldMap {
    voxel_size: [f64; 3],
    gains: Volume<Complex64>,
}

impl GridFieldMap {
    pub fn for_object(object: &ObjectModel, gains: Volume<Complex64>) -> Result<Self, Error> {
        if gains.shape() != object.shape() {
            return Err(Error::ShapeMismatch {
                expected: object.shape(),
                found: gains.shape(),
            });
        }
        Ok(Self {
            voxel_size: object.voxel_size(),
            gains,
        })
    }

    pub fn shape(&self) -> Shape {
        self.gains.shape()
    }
}

impl FieldMap for GridFieldMap {
    fn gain(&self, position: [f64; 3]) -> Complex64 {
        object::nearest_voxel(self.gains.shape(), self.voxel_size, position)
            .and_then(|coord| self.gains.get(coord))
            .copied()
            .unwrap_or_default()
    }
}
