use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use transplant::formats::mul;
use transplant::placement::PlacementContext;
use transplant::verify::{collect_region, compare, expected_region};
use transplant::{
    run_transplant, spawn_transplant, BlockGrid, CancellationToken, ElevationMode, FileStorage,
    LandTile, Layout, NoopObserver, PlacementMode, Point, Rect, StaticBlocks, StaticEntry,
    TerrainGrid, TransplantError, TransplantObserver, TransplantOptions, TransplantState,
    WorldConfig, WorldStorage,
};

/// Deterministic statics spread over every block of a world.
fn scatter(block_count: usize, seed: u32) -> StaticBlocks {
    let mut state = seed;
    let mut next = || {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        (state >> 16) & 0x7fff
    };
    (0..block_count)
        .map(|_| {
            (0..next() % 4)
                .map(|_| {
                    StaticEntry::new(
                        (next() % 64) as u16 + 0x400,
                        (next() % 8) as u8,
                        (next() % 8) as u8,
                        (next() % 40) as i8 - 20,
                        (next() % 2) as u16,
                    )
                })
                .collect()
        })
        .collect()
}

fn subdir(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write a world of `width` x `height` tiles into `dir` on disk.
fn write_world(dir: &Path, width: u32, height: u32, seed: u32) -> WorldConfig {
    let world = WorldConfig::from_dir(dir, 0);
    let mut storage = FileStorage;

    let mut terrain = TerrainGrid::new(width, height);
    for y in 0..height {
        for x in 0..width {
            terrain.set(x, y, LandTile::new(((x * 7 + y * 3 + seed) % 500) as u16, (x % 20) as i8));
        }
    }
    storage.write_land_tiles(&world.map_path, &terrain).unwrap();

    let grid = BlockGrid::for_world(width, height, Layout::ColumnMajor);
    let blocks = scatter(grid.block_count(), seed);
    storage
        .write_statics(
            &world.statics_index_path,
            &world.statics_data_path,
            width,
            height,
            &blocks,
        )
        .unwrap();
    world
}

fn run(options: &TransplantOptions) -> transplant::Result<transplant::TransplantReport> {
    run_transplant(&mut FileStorage, options, &CancellationToken::new(), &mut NoopObserver)
}

#[test]
fn transplant_between_files_every_mode() {
    for mode in [
        PlacementMode::CellMatch,
        PlacementMode::EntryTranslate,
        PlacementMode::BlockReplaceAligned,
    ] {
        let dir = tempdir().unwrap();
        let source = write_world(&subdir(dir.path(), "a"), 64, 64, 1);
        let dest = write_world(&subdir(dir.path(), "b"), 48, 48, 2);

        let mut options = TransplantOptions::new(
            source,
            dest.clone(),
            Rect::new(8, 16, 24, 16),
            Point::new(16, 24),
        );
        options.placement = mode;
        let report = run(&options).unwrap();

        let verification = report.verification.expect("verification ran");
        assert!(verification.is_clean(), "mode {:?}: {:?}", mode, verification);
        assert_eq!(report.terrain_cells_copied, 24 * 16, "mode {:?}", mode);
        assert!(!report.snapped);
        assert_eq!(
            mul::world_size_from_map_len(fs::metadata(&dest.map_path).unwrap().len()),
            Ok((48, 48))
        );
    }
}

#[test]
fn cell_match_and_entry_translate_write_identical_files() {
    let dir = tempdir().unwrap();
    let source = write_world(&subdir(dir.path(), "a"), 32, 32, 5);

    let mut outputs = Vec::new();
    for (name, mode) in [
        ("cell", PlacementMode::CellMatch),
        ("entry", PlacementMode::EntryTranslate),
    ] {
        let dest = write_world(&subdir(dir.path(), name), 32, 32, 9);
        let mut options = TransplantOptions::new(
            source.clone(),
            dest.clone(),
            Rect::new(3, 5, 13, 9),
            Point::new(11, 20),
        );
        options.placement = mode;
        options.copy_terrain = false;
        run(&options).unwrap();

        let blocks = FileStorage
            .read_statics(&dest.statics_index_path, &dest.statics_data_path, 32, 32)
            .unwrap();
        let grid = BlockGrid::for_world(32, 32, Layout::ColumnMajor);
        outputs.push(collect_region(&blocks, &grid, Rect::new(0, 0, 32, 32)));
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn copy_back_restores_region() {
    let dir = tempdir().unwrap();
    let a = write_world(&subdir(dir.path(), "a"), 32, 32, 3);
    let b = write_world(&subdir(dir.path(), "b"), 32, 32, 4);
    let original = FileStorage
        .read_statics(&a.statics_index_path, &a.statics_data_path, 32, 32)
        .unwrap();

    let rect = Rect::new(4, 4, 12, 12);
    let there = TransplantOptions::new(a.clone(), b.clone(), rect, Point::new(16, 16));
    run(&there).unwrap();

    // Wipe the region in the source, then copy it back.
    let grid = BlockGrid::for_world(32, 32, Layout::ColumnMajor);
    let wiped: StaticBlocks = vec![Vec::new(); grid.block_count()];
    FileStorage
        .write_statics(&a.statics_index_path, &a.statics_data_path, 32, 32, &wiped)
        .unwrap();
    let back = TransplantOptions::new(b, a.clone(), Rect::new(16, 16, 12, 12), Point::new(4, 4));
    run(&back).unwrap();

    let restored = FileStorage
        .read_statics(&a.statics_index_path, &a.statics_data_path, 32, 32)
        .unwrap();
    assert_eq!(
        collect_region(&restored, &grid, rect),
        collect_region(&original, &grid, rect)
    );
}

#[test]
fn unwritten_destination_reports_every_entry_missing() {
    let dir = tempdir().unwrap();
    let source = write_world(&subdir(dir.path(), "a"), 32, 32, 11);
    let storage = FileStorage;
    let blocks = storage
        .read_statics(&source.statics_index_path, &source.statics_data_path, 32, 32)
        .unwrap();
    let grid = BlockGrid::for_world(32, 32, Layout::ColumnMajor);
    let empty: StaticBlocks = vec![Vec::new(); grid.block_count()];

    let ctx = PlacementContext::new(Rect::new(0, 0, 16, 16), Point::new(16, 16), grid, grid);
    let expected = expected_region(&ctx, &blocks);
    let report = compare(&expected, &collect_region(&empty, &grid, ctx.dest_rect()));

    assert_eq!(report.missing_count(), report.expected);
    assert_eq!(report.extra_count(), 0);
    assert_eq!(report.found, 0);
}

#[test]
fn cancelled_run_leaves_files_untouched() {
    let dir = tempdir().unwrap();
    let source = write_world(&subdir(dir.path(), "a"), 32, 32, 1);
    let dest = write_world(&subdir(dir.path(), "b"), 32, 32, 2);
    let before = [
        fs::read(&dest.map_path).unwrap(),
        fs::read(&dest.statics_index_path).unwrap(),
        fs::read(&dest.statics_data_path).unwrap(),
    ];

    let cancel = CancellationToken::new();
    cancel.cancel();
    let options = TransplantOptions::new(
        source,
        dest.clone(),
        Rect::new(0, 0, 16, 16),
        Point::new(8, 8),
    );
    let err = run_transplant(&mut FileStorage, &options, &cancel, &mut NoopObserver).unwrap_err();
    assert!(matches!(err, TransplantError::Cancelled(_)));

    let after = [
        fs::read(&dest.map_path).unwrap(),
        fs::read(&dest.statics_index_path).unwrap(),
        fs::read(&dest.statics_data_path).unwrap(),
    ];
    assert_eq!(before, after);
}

/// Cancels as soon as statics placement starts.
struct CancelOnStatics(CancellationToken);

impl TransplantObserver for CancelOnStatics {
    fn on_state(&mut self, state: TransplantState) {
        if state == TransplantState::CopyingStatics {
            self.0.cancel();
        }
    }
}

#[test]
fn cancellation_after_terrain_keeps_terrain() {
    let dir = tempdir().unwrap();
    let source = write_world(&subdir(dir.path(), "a"), 32, 32, 1);
    let dest = write_world(&subdir(dir.path(), "b"), 32, 32, 2);
    let statics_before = fs::read(&dest.statics_data_path).unwrap();
    let map_before = fs::read(&dest.map_path).unwrap();

    let cancel = CancellationToken::new();
    let options = TransplantOptions::new(
        source,
        dest.clone(),
        Rect::new(0, 0, 16, 16),
        Point::new(8, 8),
    );
    let err = run_transplant(
        &mut FileStorage,
        &options,
        &cancel,
        &mut CancelOnStatics(cancel.clone()),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        TransplantError::Cancelled(TransplantState::CopyingStatics)
    ));
    assert_ne!(fs::read(&dest.map_path).unwrap(), map_before);
    assert_eq!(fs::read(&dest.statics_data_path).unwrap(), statics_before);
}

#[test]
fn fixed_elevation_on_a_background_thread() {
    let dir = tempdir().unwrap();
    let source = write_world(&subdir(dir.path(), "a"), 32, 32, 6);
    let dest = write_world(&subdir(dir.path(), "b"), 32, 32, 7);

    let mut options = TransplantOptions::new(
        source,
        dest.clone(),
        Rect::new(0, 0, 8, 8),
        Point::new(24, 24),
    );
    options.elevation = ElevationMode::Fixed(42);
    options.copy_terrain = false;
    let report = spawn_transplant(FileStorage, options, CancellationToken::new(), NoopObserver)
        .join()
        .unwrap()
        .unwrap();
    assert!(report.verification.unwrap().is_clean());

    let blocks = FileStorage
        .read_statics(&dest.statics_index_path, &dest.statics_data_path, 32, 32)
        .unwrap();
    let grid = BlockGrid::for_world(32, 32, Layout::ColumnMajor);
    let slot = grid.index(3, 3).unwrap();
    assert!(blocks[slot].iter().all(|e| e.z == 42));
}
