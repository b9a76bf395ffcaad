use crate::adjacency::AdjacencyGraph;
use crate::errors::{Result, SegError};
use crate::grid::PixelGrid;
use crate::region::{RegionId, RegionStore};

/// Region store, adjacency graph and pixel membership of one run.
#[derive(Debug, Clone)]
pub struct Partition {
    pub store: RegionStore,
    pub graph: AdjacencyGraph,
    /// Seed region of every pixel; `None` for nodata.
    pub pixel_regions: Vec<Option<RegionId>>,
}

impl Partition {
    /// One singleton region per valid pixel, linked by 4-connectivity.
    pub fn seed(grid: &PixelGrid) -> Result<Self> {
        check_region_count(grid.valid_count())?;
        let mut store = RegionStore::with_capacity(grid.valid_count());
        let mut pixel_regions = vec![None; grid.len()];

        for row in 0..grid.height() {
            for col in 0..grid.width() {
                let index = grid.index(row, col);
                if grid.is_valid_at(index) {
                    pixel_regions[index] = Some(store.create(grid.pixel_at(index), row, col));
                }
            }
        }

        let mut graph = AdjacencyGraph::new(store.capacity());
        for row in 0..grid.height() {
            for col in 0..grid.width() {
                let Some(id) = pixel_regions[grid.index(row, col)] else {
                    continue;
                };
                if col + 1 < grid.width() {
                    if let Some(right) = pixel_regions[grid.index(row, col + 1)] {
                        graph.add_boundary(id, right, 1);
                    }
                }
                if row + 1 < grid.height() {
                    if let Some(down) = pixel_regions[grid.index(row + 1, col)] {
                        graph.add_boundary(id, down, 1);
                    }
                }
            }
        }

        Ok(Self {
            store,
            graph,
            pixel_regions,
        })
    }

    /// Surviving region of every pixel.
    pub fn resolve(&self) -> Vec<Option<RegionId>> {
        let roots = self.store.roots();
        self.pixel_regions
            .iter()
            .map(|seed| seed.map(|id| roots[id.index()]))
            .collect()
    }
}

// Region ids are `u32`.
fn check_region_count(valid_pixels: usize) -> Result<()> {
    if u32::try_from(valid_pixels).is_err() {
        return Err(SegError::invalid_shape(format!(
            "{valid_pixels} valid pixels exceed the {} regions a run can address",
            u32::MAX
        )));
    }
    Ok(())
}
