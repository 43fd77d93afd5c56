//! Plant density field.
//!
//! A fixed `resolution × resolution` grid stretched over the continuous world
//! span. Every cell stays within `[0, max]` after every mutation.

use crate::config::WorldConfig;
use crate::rng::RandomSource;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Plant density grid for the environment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantField {
    width: f32,
    height: f32,
    resolution: usize,
    max: f32,
    /// Row-major cells, `cells[iy * resolution + ix]`
    cells: Vec<f32>,
}

impl PlantField {
    /// Create an empty field
    pub fn new(width: f32, height: f32, resolution: usize, max: f32) -> Self {
        Self {
            width,
            height,
            resolution,
            max,
            cells: vec![0.0; resolution * resolution],
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.width, config.height, config.grid_resolution, config.plant_max)
    }

    /// Rebuild a field from raw cells, checking shape and bounds
    pub fn from_cells(
        width: f32,
        height: f32,
        resolution: usize,
        max: f32,
        cells: Vec<f32>,
    ) -> Result<Self, String> {
        if resolution == 0 {
            return Err("field resolution must be > 0".to_string());
        }
        if !(width > 0.0 && height > 0.0 && max > 0.0) {
            return Err("field span and bound must be positive".to_string());
        }
        if cells.len() != resolution * resolution {
            return Err(format!(
                "field has {} cells, expected {}",
                cells.len(),
                resolution * resolution
            ));
        }
        if let Some(bad) = cells.iter().position(|c| !(0.0..=max).contains(c)) {
            return Err(format!("field cell {} out of bounds: {}", bad, cells[bad]));
        }
        Ok(Self {
            width,
            height,
            resolution,
            max,
            cells,
        })
    }

    #[inline]
    fn idx(&self, ix: usize, iy: usize) -> usize {
        iy * self.resolution + ix
    }

    /// Cell containing a continuous point, clamped to the grid
    #[inline]
    fn cell_at(&self, x: f32, y: f32) -> usize {
        let last = (self.resolution - 1) as f32;
        let ix = ((x / self.width) * self.resolution as f32).floor().clamp(0.0, last) as usize;
        let iy = ((y / self.height) * self.resolution as f32).floor().clamp(0.0, last) as usize;
        self.idx(ix, iy)
    }

    /// Bilinear density at a continuous point. Coordinates are clamped, not wrapped.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let res = self.resolution as f32;
        let upper = res - 1e-4;
        let gx = ((x / self.width) * res).clamp(0.0, upper);
        let gy = ((y / self.height) * res).clamp(0.0, upper);
        let x0 = gx.floor() as usize;
        let y0 = gy.floor() as usize;
        let x1 = (x0 + 1).min(self.resolution - 1);
        let y1 = (y0 + 1).min(self.resolution - 1);
        let tx = gx - x0 as f32;
        let ty = gy - y0 as f32;

        let a = self.cells[self.idx(x0, y0)];
        let b = self.cells[self.idx(x1, y0)];
        let c = self.cells[self.idx(x0, y1)];
        let d = self.cells[self.idx(x1, y1)];
        let ab = a + (b - a) * tx;
        let cd = c + (d - c) * tx;
        ab + (cd - ab) * ty
    }

    /// Remove up to `amount` from the containing cell, returns amount removed
    pub fn consume(&mut self, x: f32, y: f32, amount: f32) -> f32 {
        let k = self.cell_at(x, y);
        let taken = self.cells[k].min(amount.max(0.0));
        self.cells[k] -= taken;
        debug_assert!(self.cells[k] >= 0.0);
        taken
    }

    /// Add `amount` to the containing cell, clamped to the upper bound
    pub fn deposit(&mut self, x: f32, y: f32, amount: f32) {
        let k = self.cell_at(x, y);
        self.cells[k] = (self.cells[k] + amount).clamp(0.0, self.max);
    }

    /// Logistic-style regrowth across the whole grid
    pub fn regrow(&mut self, rate: f32) {
        let max = self.max;
        self.cells.par_iter_mut().for_each(|cell| {
            *cell = (*cell + rate * (max - *cell)).clamp(0.0, max);
        });
    }

    /// Zero the field and scatter random patches
    pub fn reset<R: RandomSource + ?Sized>(&mut self, config: &WorldConfig, rng: &mut R) {
        self.clear();
        for _ in 0..config.seed_patches {
            let x = rng.range(0.0, self.width);
            let y = rng.range(0.0, self.height);
            let amount = rng.range(config.patch_min, config.patch_max);
            self.deposit(x, y, amount);
        }
    }

    /// Zero every cell
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = 0.0);
    }

    /// Set every cell to the same value, clamped
    pub fn fill(&mut self, value: f32) {
        let v = value.clamp(0.0, self.max);
        self.cells.iter_mut().for_each(|c| *c = v);
    }

    /// Cell value by grid coordinates
    #[inline]
    pub fn get(&self, ix: usize, iy: usize) -> f32 {
        if ix < self.resolution && iy < self.resolution {
            self.cells[self.idx(ix, iy)]
        } else {
            0.0
        }
    }

    /// Density of the cell containing a continuous point
    #[inline]
    pub fn cell_value(&self, x: f32, y: f32) -> f32 {
        self.cells[self.cell_at(x, y)]
    }

    /// Row-major cells for heatmap overlays
    #[inline]
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Total plant in the field, summed row by row so the result is stable
    pub fn total(&self) -> f32 {
        let rows: Vec<f32> = self
            .cells
            .par_chunks(self.resolution)
            .map(|row| row.iter().sum::<f32>())
            .collect();
        rows.iter().sum()
    }

    /// True when every cell lies within `[0, max]`
    pub fn in_bounds(&self) -> bool {
        self.cells.iter().all(|c| (0.0..=self.max).contains(c))
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Wrap a point onto the torus spanned by the field
    #[inline]
    pub fn wrap(&self, x: f32, y: f32) -> (f32, f32) {
        (wrap_coord(x, self.width), wrap_coord(y, self.height))
    }
}

/// Wrap a coordinate into `[0, span)`
#[inline]
pub fn wrap_coord(v: f32, span: f32) -> f32 {
    let w = v.rem_euclid(span);
    // rem_euclid can round up to `span` for tiny negative inputs
    if w >= span {
        0.0
    } else {
        w
    }
}
