use crate::{Error, Shape, Timeline, TimelineBuilder};

/// An MRI protocol as seen by the kernel: something that emits events into a
/// timeline and knows the k-space it samples. How it decides on its events
/// (a file importer, a parametrized spin echo, ...) is not the kernel's
/// business, it only ever consumes the finished, validated timeline.
pub trait Sequence {
    /// Extent of the k-space filled by the acquisitions.
    fn kspace_shape(&self) -> Shape;

    /// Append all events of the protocol.
    fn emit(&self, timeline: &mut TimelineBuilder) -> Result<(), Error>;

    /// Build and validate the complete timeline.
    fn timeline(&self) -> Result<Timeline, Error> {
        let mut builder = TimelineBuilder::new();
        self.emit(&mut builder)?;
        let timeline = builder.build();
        timeline.validate(self.kspace_shape())?;
        Ok(timeline)
    }
}
