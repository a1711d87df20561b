//! Diagnostic events emitted while decoding.
//!
//! The decoder never prints. Callers that want to see intermediate geometry
//! and statistics pass a [`DecodeObserver`]; the default forwards every event
//! to `tracing` at debug level.

use crate::compose::OutputMode;
use crate::descriptor::ImageDescriptor;
use crate::normalize::SampleRange;
use crate::sniff::Format;

/// One step of a decode call.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEvent<'a> {
    FormatDetected {
        format: Format,
    },
    HeaderParsed {
        format: Format,
        entries: usize,
    },
    DescriptorResolved {
        descriptor: &'a ImageDescriptor,
    },
    /// Samples of one decoded plane that were absent, non-finite or BLANK.
    SamplesRejected {
        plane: &'static str,
        count: usize,
    },
    /// Range used to scale one output plane; `None` when no sample was valid.
    PlaneRange {
        plane: &'static str,
        range: Option<SampleRange>,
    },
    ImageComposed {
        width: u32,
        height: u32,
        mode: OutputMode,
    },
}

/// Receiver of [`DecodeEvent`]s.
pub trait DecodeObserver {
    fn on_event(&self, event: &DecodeEvent<'_>);
}

/// Forwards events to `tracing` as structured debug records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DecodeObserver for TracingObserver {
    fn on_event(&self, event: &DecodeEvent<'_>) {
        match event {
            DecodeEvent::FormatDetected { format } => {
                tracing::debug!(format = format.name(), "format detected");
            }
            DecodeEvent::HeaderParsed { format, entries } => {
                tracing::debug!(format = format.name(), entries, "header parsed");
            }
            DecodeEvent::DescriptorResolved { descriptor: d } => {
                tracing::debug!(
                    width = d.width,
                    height = d.height,
                    channels = d.channels,
                    sample_format = ?d.sample_format,
                    offset = d.payload_offset,
                    length = d.payload_length,
                    "image descriptor resolved"
                );
            }
            DecodeEvent::SamplesRejected { plane, count } => {
                tracing::debug!(plane, count, "samples excluded from range");
            }
            DecodeEvent::PlaneRange { plane, range } => match range {
                Some(r) => tracing::debug!(plane, min = r.min, max = r.max, "plane range"),
                None => tracing::debug!(plane, "plane has no valid samples"),
            },
            DecodeEvent::ImageComposed {
                width,
                height,
                mode,
            } => {
                tracing::debug!(width, height, mode = ?mode, "image composed");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl DecodeObserver for NullObserver {
    fn on_event(&self, _event: &DecodeEvent<'_>) {}
}

impl<T: DecodeObserver + ?Sized> DecodeObserver for &T {
    fn on_event(&self, event: &DecodeEvent<'_>) {
        (**self).on_event(event)
    }
}
