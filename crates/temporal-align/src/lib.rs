//! Temporal alignment of microwave land-surface temperature onto GOES scenes.
//!
//! Every scene pixel is assigned the 15-minute microwave slot matching its
//! longitude-derived local time. Scenes near local midnight straddle two
//! local dates; those pixels index a two-day stack.

pub mod error;
pub mod interpolation;
pub mod metadata;
pub mod processor;
pub mod slots;
pub mod types;

pub use error::{AlignError, AlignResult};
pub use processor::{output_file_name, AlignOutcome, AlignedField, Aligner, MicrowaveStatus};
pub use slots::{local_slot, plan_slots, SlotPlan};
pub use types::LatLonGrid;
