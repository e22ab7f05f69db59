//! Batch driver for microwave LST alignment.
//!
//! - [`scan`]: finds a city's downloaded scenes
//! - [`batch`]: aligns them in parallel
//! - [`inventory`]: reports which daily microwave grids are available

pub mod batch;
pub mod error;
pub mod inventory;
pub mod scan;

pub use batch::{AlignmentBatch, AlignmentTask, BatchSummary};
pub use error::{DriverError, DriverResult};
pub use inventory::{inventory, GridStatus, InventoryEntry, InventorySummary};
pub use scan::{list_rasters, resolve_timestamp, stamp_of, RasterFile};
