//! Streaming engine: fragment classification, reconciliation, and the
//! phased reply protocol.

pub mod extractor;
pub mod phases;
pub mod reconciler;

pub use extractor::{FragmentOutcome, SegmentExtractor};
pub use phases::TutorEngine;
pub use reconciler::{FlushSink, PassOutcome, Reconciler};
