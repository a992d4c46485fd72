use num_complex::Complex64;

use crate::{Error, Shape, Volume};

/// Dense complex k-space buffer. Coordinates that no acquisition visited stay
/// zero. Layout is centred: index `n/2` of every axis is the k-space origin.
#[derive(Debug, Clone, PartialEq)]
pub struct KSpace(Volume<Complex64>);

impl KSpace {
    pub fn zeros(shape: Shape) -> Self {
        Self(Volume::zeros(shape))
    }

    pub fn from_volume(volume: Volume<Complex64>) -> Self {
        Self(volume)
    }

    pub fn shape(&self) -> Shape {
        self.0.shape()
    }

    pub fn get(&self, coord: [usize; 3]) -> Option<Complex64> {
        self.0.get(coord).copied()
    }

    pub fn data(&self) -> &[Complex64] {
        self.0.data()
    }

    pub fn as_volume(&self) -> &Volume<Complex64> {
        &self.0
    }

    pub fn into_volume(self) -> Volume<Complex64> {
        self.0
    }

    pub(crate) fn data_mut(&mut self) -> &mut [Complex64] {
        self.0.data_mut()
    }

    /// Add to the sample at a linear index that was bounds checked while
    /// validating the timeline.
    pub(crate) fn add(&mut self, index: usize, value: Complex64) {
        self.0.data_mut()[index] += value;
    }

    /// Sum another buffer of the same shape into this one. This is the
    /// reduction step combining the partial buffers of all partitions.
    pub fn merge(&mut self, other: &KSpace) -> Result<(), Error> {
        if self.shape() != other.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        for (acc, x) in self.0.data_mut().iter_mut().zip(other.data()) {
            *acc += x;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::KSpace;
    use crate::Shape;
    use assert2::check;
    use num_complex::Complex64;

    #[test]
    fn merge_sums_per_coordinate() {
        let shape = Shape::new([2, 1, 1]).unwrap();
        let mut a = KSpace::zeros(shape);
        let mut b = KSpace::zeros(shape);
        a.add(0, Complex64::new(1.0, 2.0));
        b.add(0, Complex64::new(0.5, -1.0));
        b.add(1, Complex64::new(0.0, 3.0));

        a.merge(&b).unwrap();
        check!(a.get([0, 0, 0]) == Some(Complex64::new(1.5, 1.0)));
        check!(a.get([1, 0, 0]) == Some(Complex64::new(0.0, 3.0)));
        check!(a.get([2, 0, 0]) == None);
    }

    #[test]
    fn merge_requires_same_shape() {
        let mut a = KSpace::zeros(Shape::new([2, 1, 1]).unwrap());
        let b = KSpace::zeros(Shape::new([1, 2, 1]).unwrap());
        check!(a.merge(&b).is_err());
    }
}
