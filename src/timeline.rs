use crate::{Error, Shape};

/// What an event does to the magnetization. See the kernel for the exact
/// operator each variant applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// Hard pulse, applied instantaneously at the event start. The duration
    /// only reserves time on the timeline.
    Rf {
        /// Unit: `rad`
        flip_angle: f64,
        /// Axis of rotation, measured from x. Unit: `rad`
        phase: f64,
    },
    /// Constant gradient over the event duration. Only dephases: relaxation
    /// is the job of a precession event covering the same interval.
    Gradient {
        /// Unit: `Hz / m`
        amplitude: [f64; 3],
    },
    /// Off-resonance rotation and relaxation over the event duration.
    Precession,
    /// Sample the transverse magnetization into k-space at `coord`.
    Acquisition {
        coord: [usize; 3],
        /// Receiver demodulation phase. Unit: `rad`
        phase: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Unit: `s`
    pub start: f64,
    /// Unit: `s`
    pub duration: f64,
    pub kind: EventKind,
}

impl Event {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    fn is_rf(&self) -> bool {
        matches!(self.kind, EventKind::Rf { .. })
    }

    fn is_acquisition(&self) -> bool {
        matches!(self.kind, EventKind::Acquisition { .. })
    }
}

/// Fully materialized list of events, in the order the kernel applies them.
/// Events starting at the same time are applied in list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    events: Vec<Event>,
}

impl Timeline {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// End of the last event. Unit: `s`
    pub fn duration(&self) -> f64 {
        self.events.iter().map(Event::end).fold(0.0, f64::max)
    }

    pub fn acquisition_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_acquisition()).count()
    }

    /// Check everything the kernel relies on, so that a run never fails
    /// half-way because of its input:
    /// - all times and parameters are finite, durations are not negative
    /// - start times never decrease
    /// - no RF event overlaps an acquisition event
    /// - no RF or acquisition event starts while an earlier gradient or
    ///   precession is still running, those are applied as a whole
    /// - every acquisition coordinate lies inside `shape`
    pub fn validate(&self, shape: Shape) -> Result<(), Error> {
        // (index, start) of the latest and (index, end) of the longest
        // reaching event of each kind seen so far
        let mut last_rf: Option<(usize, f64)> = None;
        let mut rf_reach: Option<(usize, f64)> = None;
        let mut last_adc: Option<(usize, f64)> = None;
        let mut adc_reach: Option<(usize, f64)> = None;
        let mut interval_reach: Option<(usize, f64)> = None;
        let mut previous = f64::NEG_INFINITY;

        for (index, event) in self.events.iter().enumerate() {
            check_finite(index, event)?;
            if event.start < previous {
                return Err(Error::NonMonotonic {
                    index,
                    start: event.start,
                    previous,
                });
            }
            previous = event.start;

            if event.is_rf() || event.is_acquisition() {
                if let Some((running, end)) = interval_reach {
                    if event.start < end {
                        return Err(Error::InvalidEvent {
                            index,
                            reason: format!(
                                "starts at {} s, inside event #{running} which lasts until {end} s",
                                event.start
                            ),
                        });
                    }
                }
            } else {
                interval_reach = extend_reach(interval_reach, index, event.end());
            }

            if event.is_rf() {
                if let Some(acquisition) = overlapping(event, last_adc, adc_reach) {
                    return Err(Error::RfAcquisitionOverlap {
                        rf: index,
                        acquisition,
                    });
                }
                last_rf = Some((index, event.start));
                rf_reach = extend_reach(rf_reach, index, event.end());
            }

            if let EventKind::Acquisition { coord, .. } = event.kind {
                if let Some(rf) = overlapping(event, last_rf, rf_reach) {
                    return Err(Error::RfAcquisitionOverlap {
                        rf,
                        acquisition: index,
                    });
                }
                if !shape.contains(coord) {
                    return Err(Error::CoordOutOfRange {
                        index,
                        coord,
                        shape,
                    });
                }
                last_adc = Some((index, event.start));
                adc_reach = extend_reach(adc_reach, index, event.end());
            }
        }

        log::debug!(
            "Validated timeline: {} events, {} acquisitions, {:.6} s",
            self.len(),
            self.acquisition_count(),
            self.duration()
        );
        Ok(())
    }
}

fn check_finite(index: usize, event: &Event) -> Result<(), Error> {
    let invalid = |reason: &str| {
        Err(Error::InvalidEvent {
            index,
            reason: reason.to_owned(),
        })
    };

    if !event.start.is_finite() {
        return invalid("start time is not finite");
    }
    if !event.duration.is_finite() || event.duration < 0.0 {
        return invalid("duration must be finite and not negative");
    }
    match event.kind {
        EventKind::Rf { flip_angle, phase } => {
            if !flip_angle.is_finite() || !phase.is_finite() {
                return invalid("RF flip angle and phase must be finite");
            }
        }
        EventKind::Gradient { amplitude } => {
            if amplitude.iter().any(|g| !g.is_finite()) {
                return invalid("gradient amplitude must be finite");
            }
        }
        EventKind::Precession => (),
        EventKind::Acquisition { phase, .. } => {
            if !phase.is_finite() {
                return invalid("receiver phase must be finite");
            }
        }
    }
    Ok(())
}

/// Since start times are sorted, an earlier event overlaps `event` if it
/// reaches past its start or (for instantaneous events) starts at the same
/// time.
fn overlapping(
    event: &Event,
    last: Option<(usize, f64)>,
    reach: Option<(usize, f64)>,
) -> Option<usize> {
    match (last, reach) {
        (Some((index, start)), _) if start == event.start => Some(index),
        (_, Some((index, end))) if event.start < end => Some(index),
        _ => None,
    }
}

fn extend_reach(reach: Option<(usize, f64)>, index: usize, end: f64) -> Option<(usize, f64)> {
    match reach {
        Some((_, current)) if current >= end => reach,
        _ => Some((index, end)),
    }
}

/// Cursor based timeline construction, the interface protocols use to emit
/// their events. Every method appends at the cursor and moves it to the end
/// of what was appended.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    events: Vec<Event>,
    cursor: f64,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time. Unit: `s`
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Events appended so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Hard pulse at the cursor. No relaxation happens during `duration`.
    pub fn rf(&mut self, flip_angle: f64, phase: f64, duration: f64) -> &mut Self {
        self.append(duration, EventKind::Rf { flip_angle, phase })
    }

    /// Gradient without the accompanying precession, use `encode` unless
    /// relaxation over the interval is handled elsewhere.
    pub fn gradient(&mut self, amplitude: [f64; 3], duration: f64) -> &mut Self {
        self.append(duration, EventKind::Gradient { amplitude })
    }

    pub fn precess(&mut self, duration: f64) -> &mut Self {
        self.append(duration, EventKind::Precession)
    }

    /// Gradient and free precession over the same interval.
    pub fn encode(&mut self, amplitude: [f64; 3], duration: f64) -> &mut Self {
        self.events.push(Event {
            start: self.cursor,
            duration,
            kind: EventKind::Gradient { amplitude },
        });
        self.append(duration, EventKind::Precession)
    }

    /// Instantaneous sample at the cursor.
    pub fn acquire(&mut self, coord: [usize; 3]) -> &mut Self {
        self.acquire_with_phase(coord, 0.0)
    }

    pub fn acquire_with_phase(&mut self, coord: [usize; 3], phase: f64) -> &mut Self {
        self.append(0.0, EventKind::Acquisition { coord, phase })
    }

    /// Append an explicit event, the cursor moves to its end if that is
    /// later than the current cursor.
    pub fn push(&mut self, event: Event) -> &mut Self {
        self.cursor = self.cursor.max(event.end());
        self.events.push(event);
        self
    }

    pub fn build(self) -> Timeline {
        Timeline::new(self.events)
    }

    fn append(&mut self, duration: f64, kind: EventKind) -> &mut Self {
        self.events.push(Event {
            start: self.cursor,
            duration,
            kind,
        });
        self.cursor += duration;
        self
    }
}
