use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Edge length of a block in tiles. Shared by every world regardless of size.
pub const BLOCK_SIZE: u32 = 8;

// ─── Types ──────────────────────────────────────────────────────────────────

/// Rectangle over tile coordinates. `right()` and `bottom()` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A tile position, used as the paste origin in the destination world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// Why a region does not fit its worlds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundsError {
    #[error("region is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error(
        "source region exceeds the source world on {axis} by {overflow} tiles (extent {extent})"
    )]
    Source { axis: Axis, overflow: u64, extent: u32 },
    #[error(
        "destination region exceeds the destination world on {axis} by {overflow} tiles \
         (extent {extent})"
    )]
    Destination { axis: Axis, overflow: u64, extent: u32 },
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Saturates at `u32::MAX`.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Saturates at `u32::MAX`.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Same size, moved so that its top-left corner sits at `origin`.
    pub fn translate_to(&self, origin: Point) -> Rect {
        Rect::new(origin.x, origin.y, self.width, self.height)
    }

    /// Inclusive range of block columns the rectangle touches.
    pub fn block_columns(&self) -> RangeInclusive<u32> {
        self.x / BLOCK_SIZE..=(self.right() - 1) / BLOCK_SIZE
    }

    /// Inclusive range of block rows the rectangle touches.
    pub fn block_rows(&self) -> RangeInclusive<u32> {
        self.y / BLOCK_SIZE..=(self.bottom() - 1) / BLOCK_SIZE
    }

    /// Number of blocks the rectangle touches.
    pub fn block_count(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        let columns = self.block_columns();
        let rows = self.block_rows();
        (*columns.end() - *columns.start() + 1) as u64 * (*rows.end() - *rows.start() + 1) as u64
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ─── Validation ─────────────────────────────────────────────────────────────

/// Check that `source_rect` lies inside the source world and that the same
/// rectangle anchored at `dest_origin` lies inside the destination world.
pub fn validate_bounds(
    source_rect: Rect,
    source_width: u32,
    source_height: u32,
    dest_origin: Point,
    dest_width: u32,
    dest_height: u32,
) -> Result<(), BoundsError> {
    if source_rect.is_empty() {
        return Err(BoundsError::Empty {
            width: source_rect.width,
            height: source_rect.height,
        });
    }

    let overflow = |start: u32, len: u32, extent: u32| -> u64 {
        (start as u64 + len as u64).saturating_sub(extent as u64)
    };

    let checks = [
        (Axis::X, source_rect.x, source_width, dest_origin.x, dest_width, source_rect.width),
        (Axis::Y, source_rect.y, source_height, dest_origin.y, dest_height, source_rect.height),
    ];

    for (axis, start, extent, _, _, len) in checks {
        let over = overflow(start, len, extent);
        if over > 0 {
            return Err(BoundsError::Source {
                axis,
                overflow: over,
                extent,
            });
        }
    }
    for (axis, _, _, start, extent, len) in checks {
        let over = overflow(start, len, extent);
        if over > 0 {
            return Err(BoundsError::Destination {
                axis,
                overflow: over,
                extent,
            });
        }
    }
    Ok(())
}

// ─── Block alignment ────────────────────────────────────────────────────────

fn floor_to_block(value: u32) -> u32 {
    value - value % BLOCK_SIZE
}

fn snap_span(start: u32, len: u32, max: u32) -> (u32, u32) {
    let snapped_start = floor_to_block(start);
    let end_exclusive = start as u64 + len as u64;
    let block = BLOCK_SIZE as u64;
    let ceil_end = end_exclusive.div_ceil(block) * block;
    let last = (ceil_end.saturating_sub(1)).min(max.saturating_sub(1) as u64) as u32;
    if last < snapped_start {
        return (snapped_start, 0);
    }
    (snapped_start, last - snapped_start + 1)
}

/// Grow `rect` outward to whole blocks, clamped to a `max_width` x `max_height` world.
pub fn snap_rect_to_blocks(rect: Rect, max_width: u32, max_height: u32) -> Rect {
    let (x, width) = snap_span(rect.x, rect.width, max_width);
    let (y, height) = snap_span(rect.y, rect.height, max_height);
    Rect::new(x, y, width, height)
}

/// Move `point` down to the block it falls in, keeping that block inside the world.
pub fn snap_point_to_block(point: Point, max_width: u32, max_height: u32) -> Point {
    let clamp = |value: u32, max: u32| -> u32 {
        floor_to_block(value).min(floor_to_block(max.saturating_sub(BLOCK_SIZE)))
    };
    Point::new(clamp(point.x, max_width), clamp(point.y, max_height))
}

pub fn is_block_aligned(rect: Rect, dest_origin: Point) -> bool {
    [
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        dest_origin.x,
        dest_origin.y,
    ]
    .iter()
    .all(|v| v % BLOCK_SIZE == 0)
}
