use thiserror::Error;

use crate::Shape;

/// Everything that can make a simulation or reconstruction fail. None of
/// these are transient: a run either produces a complete result or one of
/// these errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Configuration errors, always reported before any work starts
    #[error("shape {0:?} has an empty axis")]
    EmptyShape([usize; 3]),
    #[error("{len} values do not fill a volume of shape {shape}")]
    LengthMismatch { shape: Shape, len: usize },
    #[error("expected data of shape {expected}, got {found}")]
    ShapeMismatch { expected: Shape, found: Shape },
    #[error("voxel {coord:?} is outside of the object of shape {shape}")]
    VoxelOutOfRange { coord: [usize; 3], shape: Shape },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("event #{index}: {reason}")]
    InvalidEvent { index: usize, reason: String },
    #[error("event #{index} starts at {start} s, before the previous event at {previous} s")]
    NonMonotonic {
        index: usize,
        start: f64,
        previous: f64,
    },
    #[error("RF event #{rf} overlaps acquisition event #{acquisition}")]
    RfAcquisitionOverlap { rf: usize, acquisition: usize },
    #[error("acquisition event #{index} samples {coord:?}, outside of k-space {shape}")]
    CoordOutOfRange {
        index: usize,
        coord: [usize; 3],
        shape: Shape,
    },

    // Errors during the run, fatal to the whole run
    #[error("isochromat #{isochromat} at {position:?}: {reason}")]
    InvalidTissue {
        isochromat: usize,
        position: [f64; 3],
        reason: String,
    },
    #[error("non-finite magnetization {magnetization:?} of isochromat #{isochromat} at {position:?} after event #{event}")]
    NonFinite {
        isochromat: usize,
        position: [f64; 3],
        event: usize,
        magnetization: [f64; 3],
    },
    #[error("worker simulating partition #{partition} failed: {message}")]
    WorkerFailed { partition: usize, message: String },

    #[error("could not import sequence: {0}")]
    Import(String),
}
