use serde::{Deserialize, Serialize};

use crate::geometry::BLOCK_SIZE;

/// How a block coordinate maps onto a linear block array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    RowMajor,
    /// The native order of the legacy world files.
    #[default]
    ColumnMajor,
}

/// Linear block index. Unchecked: callers compare the result against the
/// grid size themselves.
pub fn block_index(
    block_x: i64,
    block_y: i64,
    block_width: i64,
    block_height: i64,
    layout: Layout,
) -> i64 {
    match layout {
        Layout::RowMajor => block_y * block_width + block_x,
        Layout::ColumnMajor => block_x * block_height + block_y,
    }
}

/// Block dimensions and layout of one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    pub block_width: u32,
    pub block_height: u32,
    pub layout: Layout,
}

impl BlockGrid {
    pub fn new(block_width: u32, block_height: u32, layout: Layout) -> Self {
        BlockGrid {
            block_width,
            block_height,
            layout,
        }
    }

    /// Grid of a `width` x `height` tile world. Partial blocks at the edge count as whole blocks.
    pub fn for_world(width: u32, height: u32, layout: Layout) -> Self {
        BlockGrid::new(
            width.div_ceil(BLOCK_SIZE),
            height.div_ceil(BLOCK_SIZE),
            layout,
        )
    }

    pub fn block_count(&self) -> usize {
        self.block_width as usize * self.block_height as usize
    }

    /// Slot of block `(block_x, block_y)`, or `None` when it lies outside the grid.
    pub fn index(&self, block_x: i64, block_y: i64) -> Option<usize> {
        if block_x < 0
            || block_y < 0
            || block_x >= self.block_width as i64
            || block_y >= self.block_height as i64
        {
            return None;
        }
        self.raw_index(block_x, block_y)
    }

    /// Slot of block `(block_x, block_y)` without per-axis checks; only the
    /// final index is range checked.
    pub fn raw_index(&self, block_x: i64, block_y: i64) -> Option<usize> {
        let index = block_index(
            block_x,
            block_y,
            self.block_width as i64,
            self.block_height as i64,
            self.layout,
        );
        if index < 0 || index >= self.block_count() as i64 {
            return None;
        }
        Some(index as usize)
    }

    /// Slot of the block holding tile `(x, y)`.
    pub fn index_of_tile(&self, x: u32, y: u32) -> Option<usize> {
        self.index((x / BLOCK_SIZE) as i64, (y / BLOCK_SIZE) as i64)
    }

    /// Inverse of [`BlockGrid::index`].
    pub fn coords(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.block_count() {
            return None;
        }
        let index = index as u32;
        Some(match self.layout {
            Layout::RowMajor => (index % self.block_width, index / self.block_width),
            Layout::ColumnMajor => (index / self.block_height, index % self.block_height),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_index_formulas() {
        assert_eq!(block_index(3, 1, 4, 2, Layout::RowMajor), 7);
        assert_eq!(block_index(3, 1, 4, 2, Layout::ColumnMajor), 7);
        assert_eq!(block_index(1, 0, 4, 2, Layout::RowMajor), 1);
        assert_eq!(block_index(1, 0, 4, 2, Layout::ColumnMajor), 2);
        assert_eq!(block_index(0, 1, 4, 2, Layout::RowMajor), 4);
        assert_eq!(block_index(0, 1, 4, 2, Layout::ColumnMajor), 1);
    }

    #[test]
    fn test_grid_index_rejects_outside() {
        let grid = BlockGrid::for_world(32, 16, Layout::RowMajor);
        assert_eq!(grid.block_count(), 8);
        assert_eq!(grid.index(3, 1), Some(7));
        assert_eq!(grid.index(4, 0), None);
        assert_eq!(grid.index(-1, 0), None);
        assert_eq!(grid.index(0, 2), None);
    }

    #[test]
    fn test_raw_index_range_check_only() {
        let grid = BlockGrid::new(4, 2, Layout::RowMajor);
        // Column 4 wraps onto the next row; the index itself is still in range.
        assert_eq!(grid.raw_index(4, 0), Some(4));
        assert_eq!(grid.raw_index(4, 1), None);
    }

    #[test]
    fn test_coords_inverse() {
        for layout in [Layout::RowMajor, Layout::ColumnMajor] {
            let grid = BlockGrid::new(5, 3, layout);
            for i in 0..grid.block_count() {
                let (bx, by) = grid.coords(i).unwrap();
                assert_eq!(grid.index(bx as i64, by as i64), Some(i));
            }
            assert_eq!(grid.coords(grid.block_count()), None);
        }
    }

    #[test]
    fn test_partial_edge_blocks() {
        let grid = BlockGrid::for_world(20, 9, Layout::ColumnMajor);
        assert_eq!((grid.block_width, grid.block_height), (3, 2));
        assert_eq!(grid.index_of_tile(19, 8), Some(2 * 2 + 1));
    }
}
