//! Region transplant engine for tile-and-object worlds.
//!
//! Copies a rectangle of terrain and static objects from one world to another
//! at any offset, with optional tile remapping, patch overlays and elevation
//! adjustment, and verifies what was written.

pub mod elevation;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod layout;
pub mod overlay;
pub mod placement;
pub mod progress;
pub mod remap;
pub mod storage;
pub mod tile;
pub mod transplant;
pub mod verify;

pub use elevation::ElevationMode;
pub use error::{Result, TransplantError};
pub use geometry::{BoundsError, Point, Rect, BLOCK_SIZE};
pub use layout::{BlockGrid, Layout};
pub use overlay::Overlay;
pub use placement::{PlacementMode, PlacementStats};
pub use progress::{CancellationToken, NoopObserver, TransplantObserver};
pub use remap::TileReplacementMap;
pub use storage::{FileStorage, MemoryStorage, WorldStorage};
pub use tile::{LandTile, StaticBlocks, StaticEntry, TerrainGrid};
pub use transplant::{
    run_transplant, spawn_transplant, OverlayConfig, RegionFields, TransplantOptions,
    TransplantReport, TransplantState, TransplantWarning, WorldConfig,
};
pub use verify::VerificationReport;
