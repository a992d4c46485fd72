use crate::{Error, Isochromat, Shape, Tissue};

/// Voxelized tissue object. Every voxel holds zero or more spin populations
/// (e.g. water and fat), each one becomes an isochromat at the voxel centre.
///
/// Voxel centres follow the same centred convention as reconstructed images:
/// voxel `i` of an axis with `n` voxels sits at `(i - n/2) * voxel_size`, so a
/// sequence encoding one k-space step per `1 / fov` reconstructs voxel `i`
/// at image index `i`.
#[derive(Debug, Clone)]
pub struct ObjectModel {
    shape: Shape,
    /// Unit: `m`
    voxel_size: [f64; 3],
    voxels: Vec<Vec<Tissue>>,
}

impl ObjectModel {
    /// Empty object: no voxel contains any tissue.
    pub fn new(shape: Shape, voxel_size: [f64; 3]) -> Result<Self, Error> {
        if voxel_size.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(Error::Config(format!(
                "voxel size must be positive, got {voxel_size:?}"
            )));
        }
        Ok(Self {
            shape,
            voxel_size,
            voxels: vec![Vec::new(); shape.len()],
        })
    }

    /// Object where every voxel contains the same tissue once.
    pub fn uniform(shape: Shape, voxel_size: [f64; 3], tissue: Tissue) -> Result<Self, Error> {
        let mut object = Self::new(shape, voxel_size)?;
        for voxel in &mut object.voxels {
            voxel.push(tissue);
        }
        Ok(object)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn voxel_size(&self) -> [f64; 3] {
        self.voxel_size
    }

    /// Field of view. Unit: `m`
    pub fn fov(&self) -> [f64; 3] {
        let dims = self.shape.dims();
        [0, 1, 2].map(|i| dims[i] as f64 * self.voxel_size[i])
    }

    /// Add another spin population to a voxel.
    pub fn add(&mut self, coord: [usize; 3], tissue: Tissue) -> Result<(), Error> {
        let index = self.voxel_index(coord)?;
        self.voxels[index].push(tissue);
        Ok(())
    }

    /// Replace the contents of a voxel with a single population.
    pub fn set(&mut self, coord: [usize; 3], tissue: Tissue) -> Result<(), Error> {
        let index = self.voxel_index(coord)?;
        self.voxels[index] = vec![tissue];
        Ok(())
    }

    pub fn get(&self, coord: [usize; 3]) -> Option<&[Tissue]> {
        self.shape.index(coord).map(|i| self.voxels[i].as_slice())
    }

    /// Centre of a voxel, see the type documentation for the convention.
    pub fn voxel_position(&self, coord: [usize; 3]) -> [f64; 3] {
        let dims = self.shape.dims();
        [0, 1, 2].map(|i| (coord[i] as f64 - (dims[i] / 2) as f64) * self.voxel_size[i])
    }

    /// Voxel whose centre is closest to `position`, `None` outside the grid.
    pub fn nearest_voxel(&self, position: [f64; 3]) -> Option<[usize; 3]> {
        nearest_voxel(self.shape, self.voxel_size, position)
    }

    /// Total number of spin populations, including empty ones.
    pub fn population_count(&self) -> usize {
        self.voxels.iter().map(Vec::len).sum()
    }

    /// All isochromats in voxel order. Populations without proton density
    /// are skipped: they cannot contribute to any signal.
    pub fn isochromats(&self) -> Vec<Isochromat> {
        self.voxels
            .iter()
            .enumerate()
            .flat_map(|(i, voxel)| {
                let position = self.voxel_position(self.shape.coord(i));
                voxel
                    .iter()
                    .filter(|tissue| tissue.proton_density != 0.0)
                    .map(move |&tissue| Isochromat { position, tissue })
            })
            .collect()
    }

    fn voxel_index(&self, coord: [usize; 3]) -> Result<usize, Error> {
        self.shape.index(coord).ok_or(Error::VoxelOutOfRange {
            coord,
            shape: self.shape,
        })
    }
}

/// Grid lookup shared with voxel-sampled field maps.
pub(crate) fn nearest_voxel(
    shape: Shape,
    voxel_size: [f64; 3],
    position: [f64; 3],
) -> Option<[usize; 3]> {
    let dims = shape.dims();
    let mut coord = [0; 3];
    for i in 0..3 {
        let c = (position[i] / voxel_size[i]).round() + (dims[i] / 2) as f64;
        if !(0.0..dims[i] as f64).contains(&c) {
            return None;
        }
        coord[i] = c as usize;
    }
    Some(coord)
}
