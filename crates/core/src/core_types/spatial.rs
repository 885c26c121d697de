use geo::{Coord, Rect};
use rustc_hash::FxHashMap;

/// Inclusive bucket span `(x0, y0, x1, y1)`
type BucketSpan = (i32, i32, i32, i32);

/// Spatial index using hash-based buckets for fast bounding-box queries
///
/// Items are registered under every bucket their bounding box touches, so a
/// rectangle query returns a superset of the items whose boxes intersect it.
/// Callers run the exact geometric test on the candidates.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    buckets: FxHashMap<u64, Vec<u32>>,
    cell_size: f64,
    origin: Coord<f64>,
    /// Span of every bucket holding an item; queries never scan outside it
    occupied: Option<BucketSpan>,
}

impl SpatialIndex {
    /// Create a new spatial index anchored at `origin`
    pub fn new(origin: Coord<f64>, cell_size: f64) -> Self {
        SpatialIndex {
            buckets: FxHashMap::default(),
            cell_size,
            origin,
            occupied: None,
        }
    }

    /// Bucket column/row of a position, saturating far outside the index
    fn cell_of(&self, c: Coord<f64>) -> (i32, i32) {
        let ix = ((c.x - self.origin.x) / self.cell_size).floor() as i32;
        let iy = ((c.y - self.origin.y) / self.cell_size).floor() as i32;
        (ix, iy)
    }

    /// Insert an item covering `bounds`
    pub fn insert(&mut self, id: u32, bounds: Rect<f64>) {
        let (x0, y0) = self.cell_of(bounds.min());
        let (x1, y1) = self.cell_of(bounds.max());
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                self.buckets.entry(morton_encode(ix, iy)).or_default().push(id);
            }
        }
        self.occupied = Some(match self.occupied {
            Some((ox0, oy0, ox1, oy1)) => (ox0.min(x0), oy0.min(y0), ox1.max(x1), oy1.max(y1)),
            None => (x0, y0, x1, y1),
        });
    }

    /// Query all items whose buckets overlap `bounds`, sorted and deduplicated
    ///
    /// The scanned range is clipped to the occupied buckets, so a query far
    /// larger than the indexed area costs no more than one covering it.
    pub fn query_rect(&self, bounds: Rect<f64>) -> Vec<u32> {
        let Some((ox0, oy0, ox1, oy1)) = self.occupied else {
            return Vec::new();
        };
        let (x0, y0) = self.cell_of(bounds.min());
        let (x1, y1) = self.cell_of(bounds.max());
        let (x0, y0, x1, y1) = (x0.max(ox0), y0.max(oy0), x1.min(ox1), y1.min(oy1));

        let mut results = Vec::new();
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                if let Some(ids) = self.buckets.get(&morton_encode(ix, iy)) {
                    results.extend(ids);
                }
            }
        }
        results.sort_unstable();
        results.dedup();
        results
    }
}

/// Morton encode 2D bucket coordinates into a single 64-bit integer
/// This provides spatial locality for hash lookups
fn morton_encode(x: i32, y: i32) -> u64 {
    // Convert to unsigned to handle negative coordinates
    let x = u64::from(x as u32);
    let y = u64::from(y as u32);

    let mut result = 0u64;

    for i in 0..32 {
        result |= ((x & (1 << i)) << i) | ((y & (1 << i)) << (i + 1));
    }

    result
}
