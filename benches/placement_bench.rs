use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use transplant::placement::{copy_terrain, place_statics, PlacementContext};
use transplant::progress::ProgressTicker;
use transplant::{
    BlockGrid, LandTile, Layout, PlacementMode, Point, Rect, StaticBlocks, StaticEntry,
    TerrainGrid,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_statics(grid: &BlockGrid, per_block: u32) -> StaticBlocks {
    let mut counter = 0u32;
    (0..grid.block_count())
        .map(|_| {
            (0..per_block)
                .map(|_| {
                    counter = counter.wrapping_mul(1103515245).wrapping_add(12345);
                    StaticEntry::new(
                        (counter >> 16) as u16 & 0x3fff,
                        (counter % 8) as u8,
                        ((counter >> 3) % 8) as u8,
                        (counter >> 8) as i8,
                        0,
                    )
                })
                .collect()
        })
        .collect()
}

fn make_terrain(size: u32) -> TerrainGrid {
    let mut terrain = TerrainGrid::new(size, size);
    for y in 0..size {
        for x in 0..size {
            terrain.set(x, y, LandTile::new((x ^ y) as u16, (x % 16) as i8));
        }
    }
    terrain
}

// ── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_place_statics(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_statics");
    group.measurement_time(Duration::from_secs(3));

    let size = 512;
    let grid = BlockGrid::for_world(size, size, Layout::ColumnMajor);
    let source = make_statics(&grid, 6);
    let dest = make_statics(&grid, 2);

    for &region in &[64u32, 256] {
        let ctx = PlacementContext::new(
            Rect::new(0, 0, region, region),
            Point::new(128, 128),
            grid,
            grid,
        );
        for mode in [
            PlacementMode::CellMatch,
            PlacementMode::EntryTranslate,
            PlacementMode::BlockReplaceAligned,
        ] {
            group.bench_function(format!("{:?}_{}", mode, region), |b| {
                b.iter(|| {
                    let mut out = dest.clone();
                    let mut ticker = ProgressTicker::unobserved();
                    let stats = place_statics(mode, &ctx, &source, &mut out, &mut ticker).unwrap();
                    black_box((stats, out));
                });
            });
        }
    }
    group.finish();
}

fn bench_copy_terrain(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_terrain");
    group.measurement_time(Duration::from_secs(3));

    let source = make_terrain(512);
    let dest = TerrainGrid::new(512, 512);
    for &region in &[64u32, 256] {
        group.bench_function(format!("{}", region), |b| {
            b.iter(|| {
                let mut out = dest.clone();
                let copied = copy_terrain(
                    Rect::new(0, 0, region, region),
                    Point::new(100, 100),
                    &source,
                    &mut out,
                    None,
                    &mut ProgressTicker::unobserved(),
                )
                .unwrap();
                black_box((copied, out));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_place_statics, bench_copy_terrain);
criterion_main!(benches);
