//! Region copy orchestrator.
//!
//! [`run_transplant`] drives one copy from start to finish: it resolves world
//! sizes and the region, validates and (for whole-block placement) snaps the
//! region, loads the optional patch overlay, copies terrain, places statics,
//! writes the destination back and verifies what was written.

use std::fmt;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use crate::elevation::{ElevationMode, TerrainPair};
use crate::error::{Result, TransplantError};
use crate::geometry::{
    is_block_aligned, snap_point_to_block, snap_rect_to_blocks, validate_bounds, Point, Rect,
};
use crate::layout::{BlockGrid, Layout};
use crate::overlay::{patch_static_blocks, patch_terrain, Overlay};
use crate::placement::{
    copy_terrain, place_statics, PlacementContext, PlacementMode, PlacementStats,
};
use crate::progress::{CancellationToken, ProgressTicker, TransplantObserver};
use crate::remap::TileReplacementMap;
use crate::storage::WorldStorage;
use crate::tile::{StaticBlocks, TerrainGrid};
use crate::verify::{self, Multiset, VerificationReport};

// ─── States ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransplantState {
    Idle,
    Validating,
    LoadingOverlay,
    CopyingTerrain,
    CopyingStatics,
    Verifying,
    Done,
    Cancelled,
    Failed,
}

impl fmt::Display for TransplantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransplantState::Idle => "idle",
            TransplantState::Validating => "validation",
            TransplantState::LoadingOverlay => "overlay loading",
            TransplantState::CopyingTerrain => "terrain copy",
            TransplantState::CopyingStatics => "statics copy",
            TransplantState::Verifying => "verification",
            TransplantState::Done => "done",
            TransplantState::Cancelled => "cancelled",
            TransplantState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ─── Options ────────────────────────────────────────────────────────────────

/// File set and block layout of one world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub map_path: PathBuf,
    pub statics_index_path: PathBuf,
    pub statics_data_path: PathBuf,
    /// Explicit size in tiles. Inferred from the map file length when unset.
    #[serde(default)]
    pub size: Option<(u32, u32)>,
    #[serde(default)]
    pub layout: Layout,
}

impl WorldConfig {
    /// The conventional file names of world `index` inside `dir`
    /// (`map{n}.mul`, `staidx{n}.mul`, `statics{n}.mul`).
    pub fn from_dir(dir: impl AsRef<Path>, index: u32) -> Self {
        let dir = dir.as_ref();
        WorldConfig {
            map_path: dir.join(format!("map{}.mul", index)),
            statics_index_path: dir.join(format!("staidx{}.mul", index)),
            statics_data_path: dir.join(format!("statics{}.mul", index)),
            size: None,
            layout: Layout::default(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }
}

/// Region and paste origin as typed by a user. Parsed by [`RegionFields::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFields {
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
    pub dest_x: String,
    pub dest_y: String,
}

impl RegionFields {
    pub fn from_rect(rect: Rect, origin: Point) -> Self {
        RegionFields {
            x: rect.x.to_string(),
            y: rect.y.to_string(),
            width: rect.width.to_string(),
            height: rect.height.to_string(),
            dest_x: origin.x.to_string(),
            dest_y: origin.y.to_string(),
        }
    }

    pub fn resolve(&self) -> Result<(Rect, Point)> {
        let rect = Rect::new(
            parse_field("x", &self.x)?,
            parse_field("y", &self.y)?,
            parse_field("width", &self.width)?,
            parse_field("height", &self.height)?,
        );
        let origin = Point::new(
            parse_field("destination x", &self.dest_x)?,
            parse_field("destination y", &self.dest_y)?,
        );
        Ok((rect, origin))
    }
}

fn parse_field(name: &str, value: &str) -> Result<u32> {
    value.trim().parse::<u32>().map_err(|_| {
        TransplantError::InvalidRegion(format!(
            "{} is not a non-negative integer: {:?}",
            name, value
        ))
    })
}

/// Patch overlay applied to the source world before copying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub path: PathBuf,
    /// Records with this file id patch the source terrain. `None` ignores map patches.
    #[serde(default = "default_map_file_id")]
    pub map_file_id: Option<u32>,
    /// Records with this file id patch the source statics. `None` ignores statics patches.
    #[serde(default = "default_statics_file_id")]
    pub statics_file_id: Option<u32>,
}

fn default_map_file_id() -> Option<u32> {
    Some(crate::formats::patch::DEFAULT_MAP_FILE_ID)
}

fn default_statics_file_id() -> Option<u32> {
    Some(crate::formats::patch::DEFAULT_STATICS_FILE_ID)
}

impl OverlayConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OverlayConfig {
            path: path.into(),
            map_file_id: default_map_file_id(),
            statics_file_id: default_statics_file_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransplantOptions {
    pub source: WorldConfig,
    pub destination: WorldConfig,
    pub region: RegionFields,
    #[serde(default = "default_true")]
    pub copy_terrain: bool,
    #[serde(default = "default_true")]
    pub copy_statics: bool,
    #[serde(default)]
    pub placement: PlacementMode,
    #[serde(default)]
    pub elevation: ElevationMode,
    /// Clear the destination before placing. Off appends to what is there.
    #[serde(default = "default_true")]
    pub overwrite: bool,
    #[serde(default)]
    pub overlay: Option<OverlayConfig>,
    #[serde(default)]
    pub remap: Option<TileReplacementMap>,
    /// Re-read the destination after writing and compare it with the source.
    #[serde(default = "default_true")]
    pub verify: bool,
}

fn default_true() -> bool {
    true
}

impl TransplantOptions {
    pub fn new(source: WorldConfig, destination: WorldConfig, rect: Rect, origin: Point) -> Self {
        TransplantOptions {
            source,
            destination,
            region: RegionFields::from_rect(rect, origin),
            copy_terrain: true,
            copy_statics: true,
            placement: PlacementMode::default(),
            elevation: ElevationMode::default(),
            overwrite: true,
            overlay: None,
            remap: None,
            verify: true,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Non-fatal conditions met during a transplant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransplantWarning {
    /// The destination had no statics files; empty ones were written.
    StaticsCreated { index_path: PathBuf, data_path: PathBuf },
    /// Terrain needed for elevation could not be read; elevation was kept.
    ElevationDowngraded { reason: String },
    /// The region was grown to whole blocks for block placement.
    RegionSnapped {
        requested: Rect,
        requested_origin: Point,
        snapped: Rect,
        snapped_origin: Point,
    },
    VerificationMismatch {
        missing: usize,
        extra: usize,
        terrain_mismatches: usize,
    },
    VerificationSkipped { reason: String },
}

impl fmt::Display for TransplantWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransplantWarning::StaticsCreated {
                index_path,
                data_path,
            } => write!(
                f,
                "created empty statics {} and {}",
                index_path.display(),
                data_path.display()
            ),
            TransplantWarning::ElevationDowngraded { reason } => {
                write!(f, "terrain unavailable, keeping static elevation: {}", reason)
            }
            TransplantWarning::RegionSnapped {
                requested,
                requested_origin,
                snapped,
                snapped_origin,
            } => write!(
                f,
                "region {} at {} snapped to blocks: {} at {}",
                requested, requested_origin, snapped, snapped_origin
            ),
            TransplantWarning::VerificationMismatch {
                missing,
                extra,
                terrain_mismatches,
            } => write!(
                f,
                "verification found {} missing and {} extra statics, {} terrain mismatches",
                missing, extra, terrain_mismatches
            ),
            TransplantWarning::VerificationSkipped { reason } => {
                write!(f, "verification skipped: {}", reason)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransplantReport {
    /// Source region after snapping.
    pub source_rect: Rect,
    /// Destination origin after snapping.
    pub dest_origin: Point,
    pub snapped: bool,
    pub terrain_cells_copied: usize,
    pub statics: PlacementStats,
    /// Map patches applied to the source terrain in memory. Also counted when
    /// terrain is loaded only to offset statics by terrain height.
    pub map_patches_applied: usize,
    pub statics_patches_applied: usize,
    pub warnings: Vec<TransplantWarning>,
    pub verification: Option<VerificationReport>,
}

impl TransplantReport {
    fn warn(&mut self, warning: TransplantWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

// ─── Orchestration ──────────────────────────────────────────────────────────

/// Run one transplant against `storage`.
///
/// The observer sees every state transition, ending in `Done`, `Cancelled`
/// or `Failed`. Cancellation leaves whatever was already written in place.
pub fn run_transplant<S: WorldStorage + ?Sized>(
    storage: &mut S,
    options: &TransplantOptions,
    cancel: &CancellationToken,
    observer: &mut dyn TransplantObserver,
) -> Result<TransplantReport> {
    let mut ticker = ProgressTicker::new(cancel.clone(), 0, Some(observer));
    match execute(storage, options, &mut ticker) {
        Ok(report) => {
            ticker.finish();
            ticker.enter(TransplantState::Done);
            log::info!(
                "Transplant done: {} terrain cells, {} statics written, {} warnings",
                report.terrain_cells_copied,
                report.statics.written,
                report.warnings.len()
            );
            Ok(report)
        }
        Err(err) => {
            let state = if matches!(err, TransplantError::Cancelled(_)) {
                TransplantState::Cancelled
            } else {
                TransplantState::Failed
            };
            log::warn!("Transplant {}: {}", state, err);
            ticker.enter(state);
            Err(err)
        }
    }
}

/// Run one transplant on a dedicated thread.
pub fn spawn_transplant<S, O>(
    mut storage: S,
    options: TransplantOptions,
    cancel: CancellationToken,
    mut observer: O,
) -> JoinHandle<Result<TransplantReport>>
where
    S: WorldStorage + Send + 'static,
    O: TransplantObserver + Send + 'static,
{
    thread::spawn(move || run_transplant(&mut storage, &options, &cancel, &mut observer))
}

fn world_size<S: WorldStorage + ?Sized>(storage: &S, world: &WorldConfig) -> Result<(u32, u32)> {
    match world.size {
        Some(size) => Ok(size),
        None => storage.resolve_map_size(&world.map_path),
    }
}

fn load_terrain<S: WorldStorage + ?Sized>(
    storage: &S,
    options: &TransplantOptions,
    source_size: (u32, u32),
    dest_size: (u32, u32),
    overlay: Option<&Overlay>,
) -> Result<(TerrainGrid, TerrainGrid, usize)> {
    let mut source =
        storage.read_land_tiles(&options.source.map_path, source_size.0, source_size.1)?;
    let dest = storage.read_land_tiles(&options.destination.map_path, dest_size.0, dest_size.1)?;
    let patched = overlay.map_or(0, |overlay| patch_terrain(overlay, &mut source));
    Ok((source, dest, patched))
}

fn execute<S: WorldStorage + ?Sized>(
    storage: &mut S,
    options: &TransplantOptions,
    ticker: &mut ProgressTicker<'_>,
) -> Result<TransplantReport> {
    let mut report = TransplantReport::default();

    ticker.enter(TransplantState::Validating);
    let (source_width, source_height) = world_size(storage, &options.source)?;
    let (dest_width, dest_height) = world_size(storage, &options.destination)?;
    let (mut rect, mut origin) = options.region.resolve()?;
    validate_bounds(rect, source_width, source_height, origin, dest_width, dest_height)?;

    if options.copy_statics
        && options.placement == PlacementMode::BlockReplaceAligned
        && !is_block_aligned(rect, origin)
    {
        let snapped = snap_rect_to_blocks(rect, source_width, source_height);
        let snapped_origin = snap_point_to_block(origin, dest_width, dest_height);
        if snapped != rect || snapped_origin != origin {
            report.snapped = true;
            report.warn(TransplantWarning::RegionSnapped {
                requested: rect,
                requested_origin: origin,
                snapped,
                snapped_origin,
            });
            rect = snapped;
            origin = snapped_origin;
            validate_bounds(rect, source_width, source_height, origin, dest_width, dest_height)?;
        }
    }
    report.source_rect = rect;
    report.dest_origin = origin;
    log::info!("Transplanting {} to {}", rect, origin);

    let source_grid = BlockGrid::for_world(source_width, source_height, options.source.layout);
    let dest_grid = BlockGrid::for_world(dest_width, dest_height, options.destination.layout);

    let overlay = match &options.overlay {
        Some(config) => {
            ticker.enter(TransplantState::LoadingOverlay);
            let overlay = storage.load_overlay(
                &config.path,
                source_grid.block_count(),
                config.map_file_id,
                config.statics_file_id,
            )?;
            log::info!(
                "Loaded overlay {}: {} map patches, {} statics patches",
                config.path.display(),
                overlay.map_patch_count(),
                overlay.statics_patch_count()
            );
            Some(overlay)
        }
        None => None,
    };

    let mut units = 0;
    if options.copy_terrain {
        units += rect.height as u64;
    }
    if options.copy_statics {
        units += PlacementContext::new(rect, origin, source_grid, dest_grid)
            .units(options.placement);
    }
    ticker.set_total(units);

    // ─── Terrain ───
    let mut elevation = options.elevation;
    let needs_terrain = options.copy_terrain || (options.copy_statics && elevation.needs_terrain());
    let mut terrain: Option<(TerrainGrid, TerrainGrid)> = None;
    if needs_terrain {
        if options.copy_terrain {
            ticker.enter(TransplantState::CopyingTerrain);
        }
        match load_terrain(
            storage,
            options,
            (source_width, source_height),
            (dest_width, dest_height),
            overlay.as_ref(),
        ) {
            Ok((source, dest, patched)) => {
                report.map_patches_applied = patched;
                terrain = Some((source, dest));
            }
            Err(err) if !options.copy_terrain => {
                elevation = ElevationMode::Keep;
                report.warn(TransplantWarning::ElevationDowngraded {
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    if options.copy_terrain {
        if let Some((source, dest)) = terrain.as_mut() {
            report.terrain_cells_copied =
                copy_terrain(rect, origin, source, dest, options.remap.as_ref(), ticker)?;
            ticker.checkpoint()?;
            storage.write_land_tiles(&options.destination.map_path, dest)?;
            log::debug!(
                "Wrote {} terrain cells to {}",
                report.terrain_cells_copied,
                options.destination.map_path.display()
            );
        }
    }

    // ─── Statics ───
    let mut ctx = PlacementContext::new(rect, origin, source_grid, dest_grid);
    ctx.remap = options.remap.as_ref();
    ctx.elevation = elevation;
    ctx.overwrite = options.overwrite;
    ctx.terrain = terrain
        .as_ref()
        .map(|(source, destination)| TerrainPair { source, destination });

    let mut placed: Option<(StaticBlocks, Multiset)> = None;
    if options.copy_statics {
        ticker.enter(TransplantState::CopyingStatics);
        let dest = &options.destination;
        if !storage.exists(&dest.statics_index_path) || !storage.exists(&dest.statics_data_path) {
            ticker.checkpoint()?;
            storage.write_empty_statics(
                &dest.statics_index_path,
                &dest.statics_data_path,
                dest_width,
                dest_height,
            )?;
            report.warn(TransplantWarning::StaticsCreated {
                index_path: dest.statics_index_path.clone(),
                data_path: dest.statics_data_path.clone(),
            });
        }

        let mut source_blocks = storage.read_statics(
            &options.source.statics_index_path,
            &options.source.statics_data_path,
            source_width,
            source_height,
        )?;
        let mut dest_blocks = storage.read_statics(
            &dest.statics_index_path,
            &dest.statics_data_path,
            dest_width,
            dest_height,
        )?;
        if let Some(overlay) = overlay.as_ref() {
            report.statics_patches_applied =
                patch_static_blocks(overlay, &mut source_blocks, &source_grid);
        }

        // Entries that survive an appending copy.
        let kept = if options.overwrite {
            Multiset::default()
        } else {
            verify::collect_region(&dest_blocks, &dest_grid, ctx.dest_rect())
        };

        report.statics = place_statics(
            options.placement,
            &ctx,
            &source_blocks,
            &mut dest_blocks,
            ticker,
        )?;
        ticker.checkpoint()?;
        storage.write_statics(
            &dest.statics_index_path,
            &dest.statics_data_path,
            dest_width,
            dest_height,
            &dest_blocks,
        )?;
        log::debug!(
            "Placed statics with {:?}: {} written, {} removed, {} skipped",
            options.placement,
            report.statics.written,
            report.statics.removed,
            report.statics.skipped
        );
        placed = Some((source_blocks, kept));
    }

    // ─── Verification ───
    if options.verify && (options.copy_terrain || options.copy_statics) {
        ticker.enter(TransplantState::Verifying);
        let verified = verify_written(
            storage,
            options,
            &ctx,
            terrain.as_ref(),
            placed.as_ref(),
            (dest_width, dest_height),
        );
        match verified {
            Ok(verification) => {
                if !verification.is_clean() {
                    report.warn(TransplantWarning::VerificationMismatch {
                        missing: verification.missing_count(),
                        extra: verification.extra_count(),
                        terrain_mismatches: verification.terrain_mismatches,
                    });
                }
                report.verification = Some(verification);
            }
            Err(err) => report.warn(TransplantWarning::VerificationSkipped {
                reason: err.to_string(),
            }),
        }
    }

    Ok(report)
}

fn verify_written<S: WorldStorage + ?Sized>(
    storage: &S,
    options: &TransplantOptions,
    ctx: &PlacementContext<'_>,
    terrain: Option<&(TerrainGrid, TerrainGrid)>,
    placed: Option<&(StaticBlocks, Multiset)>,
    (dest_width, dest_height): (u32, u32),
) -> Result<VerificationReport> {
    let dest = &options.destination;
    let mut verification = VerificationReport::default();

    if let Some((source_blocks, kept)) = placed {
        let written = storage.read_statics(
            &dest.statics_index_path,
            &dest.statics_data_path,
            dest_width,
            dest_height,
        )?;
        let mut expected = verify::expected_region(ctx, source_blocks);
        for (key, count) in kept {
            *expected.entry(*key).or_insert(0) += count;
        }
        let actual = verify::collect_region(&written, &ctx.dest_grid, ctx.dest_rect());
        verification = verify::compare(&expected, &actual);
    }

    if options.copy_terrain {
        if let Some((source, _)) = terrain {
            let written = storage.read_land_tiles(&dest.map_path, dest_width, dest_height)?;
            verification.terrain_mismatches = verify::terrain_mismatches(
                ctx.source_rect,
                ctx.dest_origin,
                source,
                &written,
                options.remap.as_ref(),
            );
        }
    }
    Ok(verification)
}
