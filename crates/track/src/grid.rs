//! Uniform bucket grid over centreline segments.
//!
//! Each cell lists the segments whose bounding box touches it. A query walks
//! rings of cells outwards from the query cell and stops once no unvisited
//! segment can beat the best distance found so far, so the answer matches an
//! exhaustive scan.

use physics::Vec2;

/// Upper bound on the number of cells; the cell size grows to respect it.
const MAX_CELLS: usize = 1 << 20;

#[derive(Clone, Debug)]
pub(crate) struct SegmentGrid {
    origin: Vec2,
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
}

impl SegmentGrid {
    /// Bucket `segments` (start, end) into cells of roughly `cell_size`
    /// meters, covering `[min, max]`.
    pub(crate) fn build(segments: &[(Vec2, Vec2)], min: Vec2, max: Vec2, cell_size: f32) -> Self {
        let extent = max - min;
        let mut cell_size = cell_size.max(1.0);
        let dims = |size: f32| {
            (
                ((extent.x / size).ceil() as usize).max(1),
                ((extent.y / size).ceil() as usize).max(1),
            )
        };
        let (mut cols, mut rows) = dims(cell_size);
        while cols.saturating_mul(rows) > MAX_CELLS {
            cell_size *= 2.0;
            (cols, rows) = dims(cell_size);
        }

        let mut grid = Self { origin: min, cell_size, cols, rows, cells: vec![Vec::new(); cols * rows] };
        for (index, &(a, b)) in segments.iter().enumerate() {
            let lo = grid.clamped_cell(Vec2::new(a.x.min(b.x), a.y.min(b.y)));
            let hi = grid.clamped_cell(Vec2::new(a.x.max(b.x), a.y.max(b.y)));
            for row in lo.1..=hi.1 {
                for col in lo.0..=hi.0 {
                    grid.cells[row * cols + col].push(index);
                }
            }
        }
        grid
    }

    fn clamped_cell(&self, p: Vec2) -> (usize, usize) {
        let local = p - self.origin;
        let col = (local.x / self.cell_size).floor().max(0.0) as usize;
        let row = (local.y / self.cell_size).floor().max(0.0) as usize;
        (col.min(self.cols - 1), row.min(self.rows - 1))
    }

    fn cell_of(&self, p: Vec2) -> Option<(usize, usize)> {
        let local = p - self.origin;
        if !local.is_finite() || local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let col = (local.x / self.cell_size).floor() as usize;
        let row = (local.y / self.cell_size).floor() as usize;
        (col < self.cols && row < self.rows).then_some((col, row))
    }

    /// Segment closest to `p` under `distance`, lowest index on ties.
    ///
    /// Returns `None` when `p` lies outside the grid or the grid holds no
    /// segment; callers fall back to a full scan.
    pub(crate) fn nearest(&self, p: Vec2, mut distance: impl FnMut(usize) -> f32) -> Option<(usize, f32)> {
        let (cx, cy) = self.cell_of(p)?;
        let mut best: Option<(usize, f32)> = None;
        let max_ring = self.cols.max(self.rows);

        for ring in 0..=max_ring {
            for (col, row) in self.ring_cells(cx, cy, ring) {
                for &segment in &self.cells[row * self.cols + col] {
                    let d = distance(segment);
                    let better = match best {
                        None => true,
                        Some((idx, bd)) => d < bd || (d == bd && segment < idx),
                    };
                    if better {
                        best = Some((segment, d));
                    }
                }
            }
            // everything unvisited is at least `ring` cells away
            if let Some((_, bd)) = best {
                if bd < ring as f32 * self.cell_size {
                    return best;
                }
            }
        }
        best
    }

    fn ring_cells(&self, cx: usize, cy: usize, ring: usize) -> Vec<(usize, usize)> {
        let (cx, cy, r) = (cx as isize, cy as isize, ring as isize);
        let mut out = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs() != r && dy.abs() != r {
                    continue;
                }
                let (x, y) = (cx + dx, cy + dy);
                if x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows {
                    out.push((x as usize, y as usize));
                }
            }
        }
        out
    }

    #[cfg(test)]
    fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }
}
