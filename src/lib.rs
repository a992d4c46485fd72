//! Bloch simulation of MRI acquisitions and their reconstruction.
//!
//! An [`ObjectModel`] describes the imaged object as isochromats with tissue
//! parameters on a voxel grid. A [`Sequence`] emits a [`Timeline`] of RF
//! pulses, gradients, free precession and acquisitions. The [`Kernel`] runs
//! every isochromat through the timeline and accumulates the acquired signal
//! into a [`KSpace`], which [`reconstruct`] turns into module and phase
//! images.
//!
//! All quantities are SI: seconds, metres, `Hz` for frequencies and `Hz / m`
//! for gradients. Angles are in radians.

mod config;
mod error;
mod fieldmap;
mod kernel;
mod kspace;
mod object;
pub mod recon;
mod sequence;
mod timeline;
mod types;
mod util;

#[cfg(feature = "pulseq")]
mod backend_pulseq;

pub use config::{Accumulation, Apodization, Composition, ReconConfig, SimConfig};
pub use error::Error;
pub use fieldmap::{FieldMap, GridFieldMap, Uniform};
pub use kernel::Kernel;
pub use kspace::KSpace;
pub use object::ObjectModel;
pub use recon::{reconstruct, Image, Pipeline};
pub use sequence::Sequence;
pub use timeline::{Event, EventKind, Timeline, TimelineBuilder};
pub use types::{Isochromat, Shape, Tissue, Volume};

#[cfg(feature = "pulseq")]
pub use backend_pulseq::PulseqSequence;
