//! Tiles: disjoint sets of pixels rendered by one task per pass.
//!
//! Every pixel belongs to exactly one tile, so a task owns its pixels'
//! accumulators for the whole pass and nothing needs locking.

use std::sync::atomic::{AtomicU8, Ordering};

use luma_math::Random;
use rand::seq::SliceRandom;

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: usize = 64;

/// Progress of a tile within the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TileState {
    StandBy = 0,
    Processing = 1,
    Done = 2,
}

impl TileState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => TileState::Processing,
            2 => TileState::Done,
            _ => TileState::StandBy,
        }
    }
}

/// A set of pixel coordinates.
#[derive(Debug)]
pub struct Tile {
    pub index: usize,

    /// `(x, y)` pixel coordinates
    pub pixels: Vec<(usize, usize)>,

    state: AtomicU8,
}

impl Tile {
    pub fn new(index: usize, pixels: Vec<(usize, usize)>) -> Self {
        Self {
            index,
            pixels,
            state: AtomicU8::new(TileState::StandBy as u8),
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn state(&self) -> TileState {
        TileState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: TileState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Number of tiles a `width x height` image splits into.
pub fn tile_count(width: usize, height: usize, tile_width: usize, tile_height: usize) -> usize {
    width.div_ceil(tile_width) * height.div_ceil(tile_height)
}

/// Rectangular tiles in row-major order; edge tiles are clipped.
pub fn make_tile_array(width: usize, height: usize, tile_width: usize, tile_height: usize) -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(tile_count(width, height, tile_width, tile_height));

    for ty in (0..height).step_by(tile_height) {
        for tx in (0..width).step_by(tile_width) {
            let th = tile_height.min(height - ty);
            let tw = tile_width.min(width - tx);

            let mut pixels = Vec::with_capacity(tw * th);
            for y in ty..ty + th {
                for x in tx..tx + tw {
                    pixels.push((x, y));
                }
            }
            tiles.push(Tile::new(tiles.len(), pixels));
        }
    }

    tiles
}

/// As many tiles as [`make_tile_array`], each holding pixels drawn from
/// the whole image.
///
/// Pixels are shuffled and dealt out in contiguous runs; when the count
/// does not divide evenly the first tiles get one extra pixel.
pub fn make_scrambled_array(
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
    rng: &mut Random,
) -> Vec<Tile> {
    let mut all: Vec<(usize, usize)> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .collect();
    all.shuffle(rng);

    let count = tile_count(width, height, tile_width, tile_height);
    let base = all.len() / count;
    let extra = all.len() % count;

    let mut rest = all.as_slice();
    (0..count)
        .map(|index| {
            let len = base + usize::from(index < extra);
            let (head, tail) = rest.split_at(len);
            rest = tail;
            Tile::new(index, head.to_vec())
        })
        .collect()
}
