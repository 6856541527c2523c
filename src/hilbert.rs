//! Hilbert curve ordering over the full lat/lon domain
//!
//! The domain is quantized into a `2^depth x 2^depth` grid (longitude on x,
//! latitude on y) and every cell gets its position along the curve. Any
//! aligned quadtree block of the grid covers one contiguous run of curve
//! positions, which is what lets a sorted vertex array answer box queries
//! with a handful of binary searches.

/// Default recursion depth: cells of roughly 40 m x 20 m at the equator
pub const DEFAULT_DEPTH: u8 = 20;

/// Deepest supported curve; positions must fit in a u64
pub const MAX_DEPTH: u8 = 31;

/// Blocks along the longer side of a query box before whole blocks are
/// taken as candidates
const MAX_BLOCKS_PER_SIDE: u64 = 64;

/// Number of cells along one axis
#[inline]
fn side(depth: u8) -> u64 {
    1u64 << depth
}

/// Curve position of grid cell (x, y) on an `n x n` grid, `n` a power of two
pub fn xy_to_d(n: u64, mut x: u64, mut y: u64) -> u64 {
    let mut d = 0u64;
    let mut s = n / 2;
    while s > 0 {
        let rx = u64::from(x & s > 0);
        let ry = u64::from(y & s > 0);
        d += s * s * ((3 * rx) ^ ry);

        // rotate the quadrant so the sub-curve has canonical orientation
        if ry == 0 {
            if rx == 1 {
                x = n - 1 - x;
                y = n - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    d
}

/// Grid cell containing the point, clamped to the grid
pub fn quantize(lat: f64, lon: f64, depth: u8) -> (u64, u64) {
    let n = side(depth);
    let scale = |value: f64, offset: f64, range: f64| -> u64 {
        let cell = ((value + offset) / range * n as f64).floor();
        if cell <= 0.0 {
            0
        } else {
            (cell as u64).min(n - 1)
        }
    };
    (scale(lon, 180.0, 360.0), scale(lat, 90.0, 180.0))
}

/// Hilbert distance of a point at the given depth
pub fn distance(lat: f64, lon: f64, depth: u8) -> u64 {
    let (x, y) = quantize(lat, lon, depth);
    xy_to_d(side(depth), x, y)
}

/// Inclusive curve ranges covering every cell that intersects the box
///
/// Ranges come back sorted and with adjacent runs merged. Boxes wider than
/// [`MAX_BLOCKS_PER_SIDE`] cells are covered with coarser blocks, so the
/// ranges may include cells outside the box and callers filter exactly.
/// The range count stays bounded by the block count, not the box size.
pub fn ranges(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64, depth: u8) -> Vec<(u64, u64)> {
    let (qx0, qy0) = quantize(min_lat, min_lon, depth);
    let (qx1, qy1) = quantize(max_lat, max_lon, depth);
    let query = CellRect {
        x0: qx0,
        y0: qy0,
        x1: qx1,
        y1: qy1,
    };

    let extent = (qx1 - qx0 + 1).max(qy1 - qy0 + 1);
    let min_block = (extent / MAX_BLOCKS_PER_SIDE).max(1).next_power_of_two();

    let n = side(depth);
    let mut out = Vec::new();
    collect(n, 0, 0, n, min_block, &query, &mut out);

    out.sort_unstable();
    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(out.len());
    for (start, end) in out {
        match merged.last_mut() {
            Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

struct CellRect {
    x0: u64,
    y0: u64,
    x1: u64,
    y1: u64,
}

fn collect(
    n: u64,
    x0: u64,
    y0: u64,
    size: u64,
    min_block: u64,
    query: &CellRect,
    out: &mut Vec<(u64, u64)>,
) {
    let x1 = x0 + size - 1;
    let y1 = y0 + size - 1;
    if x1 < query.x0 || x0 > query.x1 || y1 < query.y0 || y0 > query.y1 {
        return;
    }

    let contained = x0 >= query.x0 && x1 <= query.x1 && y0 >= query.y0 && y1 <= query.y1;
    if contained || size <= min_block {
        let span = size * size;
        let start = xy_to_d(n, x0, y0) / span * span;
        out.push((start, start + span - 1));
        return;
    }

    let half = size / 2;
    collect(n, x0, y0, half, min_block, query, out);
    collect(n, x0 + half, y0, half, min_block, query, out);
    collect(n, x0, y0 + half, half, min_block, query, out);
    collect(n, x0 + half, y0 + half, half, min_block, query, out);
}
