//! Five-stage orchestration visualization sequencer.
//!
//! A single actor owns all animation state and drains an inbox of commands;
//! renderers observe frames through a `watch` channel. Backend node-log
//! records are translated into step events that either complete the current
//! stage or queue until the animation catches up, and every stage carries a
//! fallback timer so a quiet backend never stalls the run.

pub mod actor;
pub mod error;
pub mod state;
pub mod translate;

pub use actor::{Sequencer, SequencerHandle};
pub use error::{Result, SequencerError};
pub use state::{ConsoleEntry, SequencerState, StepEvent};
pub use translate::{translate, ManifestUpdate, Translation};
