//! Progressive tile renderer.
//!
//! Each pass traces a fixed number of samples for every pixel, with the
//! tiles spread over the rayon pool. Tiles hand back their radiance sums
//! and the film is updated on the calling thread, so the parallel part
//! only reads the scene. Passes repeat until the time limit runs out; a
//! pass in flight always completes.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use luma_math::{DVec2, DVec3, Random};
use rayon::prelude::*;

use crate::camera::CameraNode;
use crate::film::Film;
use crate::material::Color;
use crate::path_tracer::PathTracer;
use crate::scene::Scene;
use crate::tile::{make_scrambled_array, make_tile_array, Tile, TileState, DEFAULT_TILE_SIZE};

/// Render configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,

    /// Stratified sub-samples per pixel edge
    pub pixel_sub_samples: usize,

    /// Samples per sub-pixel per pass
    pub samples_per_pixel: usize,

    /// Bounces before Russian roulette applies
    pub min_depth: usize,

    /// Only enforced with `hard_depth_cap`
    pub max_depth: usize,
    pub hard_depth_cap: bool,

    pub min_rr_cutoff: f64,
    pub tile_size: usize,

    pub time_limit: Duration,
    pub progress_interval: Duration,
    pub quiet_progress: bool,

    /// Run exactly one pass
    pub wait_to_finish: bool,

    /// Empty means no image is written
    pub output_image: String,

    /// Wall clock when `None`
    pub seed: Option<u64>,

    pub scrambled_tiles: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            pixel_sub_samples: 1,
            samples_per_pixel: 8,
            min_depth: 1,
            max_depth: 4,
            hard_depth_cap: false,
            min_rr_cutoff: 0.005,
            tile_size: DEFAULT_TILE_SIZE,
            time_limit: Duration::from_secs(121),
            progress_interval: Duration::from_secs(15),
            quiet_progress: false,
            wait_to_finish: false,
            output_image: "output.png".to_string(),
            seed: None,
            scrambled_tiles: false,
        }
    }
}

impl RenderConfig {
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Samples each pixel receives per pass.
    pub fn samples_per_pass(&self) -> usize {
        self.pixel_sub_samples * self.pixel_sub_samples * self.samples_per_pixel
    }

    pub fn path_tracer(&self) -> PathTracer {
        let tracer = PathTracer::new(self.min_depth, self.min_rr_cutoff);
        if self.hard_depth_cap {
            tracer.with_max_depth(self.max_depth)
        } else {
            tracer
        }
    }

    /// The configured seed, or one taken from the clock.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }

    /// Make the sensor match the image aspect ratio.
    pub fn fit_camera(&self, camera: &mut CameraNode) {
        let aspect = self.aspect();
        if (camera.sensor_aspect_ratio() - aspect).abs() > 1e-6 {
            log::warn!(
                "Camera sensor aspect {:.4} differs from image aspect {:.4}; resizing sensor",
                camera.sensor_aspect_ratio(),
                aspect
            );
            camera.resize_sensor_with_aspect_ratio(aspect);
        }
    }
}

/// Path depth over a set of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStats {
    pub min: usize,
    pub max: usize,
    pub total: u64,
    pub count: u64,
}

impl Default for DepthStats {
    fn default() -> Self {
        Self {
            min: usize::MAX,
            max: 0,
            total: 0,
            count: 0,
        }
    }
}

impl DepthStats {
    pub fn record(&mut self, depth: usize) {
        self.min = self.min.min(depth);
        self.max = self.max.max(depth);
        self.total += depth as u64;
        self.count += 1;
    }

    pub fn merge(&mut self, other: &DepthStats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.total += other.total;
        self.count += other.count;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f64 / self.count as f64
        }
    }
}

/// Radiance sums of one tile for one pass, in `tile.pixels` order.
#[derive(Debug, Clone)]
pub struct TileResult {
    pub tile_index: usize,
    pub sums: Vec<Color>,
    pub depth: DepthStats,
}

/// Summary of one pass.
#[derive(Debug, Clone, Copy)]
pub struct PassStats {
    pub pass: usize,
    pub elapsed: Duration,
    pub depth: DepthStats,
}

/// Summary of a whole render.
#[derive(Debug, Clone, Copy)]
pub struct RenderStats {
    pub passes: usize,
    pub samples_per_pixel: u64,
    pub elapsed: Duration,
}

/// Drives passes over the tiles and owns the film.
pub struct Renderer<'a> {
    config: RenderConfig,
    scene: &'a Scene,
    tracer: PathTracer,
    tiles: Vec<Tile>,
    film: Film,
    seed: u64,
}

impl<'a> Renderer<'a> {
    /// The scene must be preprocessed.
    pub fn new(config: RenderConfig, scene: &'a Scene) -> Self {
        let seed = config.resolve_seed();
        let ts = config.tile_size.max(1);
        let tiles = if config.scrambled_tiles {
            make_scrambled_array(config.width, config.height, ts, ts, &mut Random::new(seed))
        } else {
            make_tile_array(config.width, config.height, ts, ts)
        };

        log::info!(
            "Renderer: {}x{}, {} tiles, {} samples per pixel per pass, seed {}",
            config.width,
            config.height,
            tiles.len(),
            config.samples_per_pass(),
            seed
        );

        Self {
            tracer: config.path_tracer(),
            film: Film::new(config.width, config.height),
            config,
            scene,
            tiles,
            seed,
        }
    }

    pub fn film(&self) -> &Film {
        &self.film
    }

    pub fn into_film(self) -> Film {
        self.film
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Render passes until the time limit, or one pass with
    /// `wait_to_finish`. `progress` is called between passes whenever the
    /// progress interval has elapsed, unless progress is quiet.
    pub fn render<F>(&mut self, mut progress: F) -> RenderStats
    where
        F: FnMut(&Film, &PassStats),
    {
        let start = Instant::now();
        let mut last_progress = start;
        let mut pass = 0;

        loop {
            let stats = self.render_pass(pass);
            pass += 1;

            if self.config.wait_to_finish || start.elapsed() >= self.config.time_limit {
                break;
            }

            if !self.config.quiet_progress && last_progress.elapsed() >= self.config.progress_interval {
                progress(&self.film, &stats);
                last_progress = Instant::now();
            }
        }

        let stats = RenderStats {
            passes: pass,
            samples_per_pixel: (pass * self.config.samples_per_pass()) as u64,
            elapsed: start.elapsed(),
        };
        log::info!(
            "Rendered {} passes, {} samples per pixel in {:.2?}",
            stats.passes,
            stats.samples_per_pixel,
            stats.elapsed
        );
        stats
    }

    /// One sweep over all tiles.
    pub fn render_pass(&mut self, pass: usize) -> PassStats {
        let start = Instant::now();
        for tile in &self.tiles {
            tile.set_state(TileState::StandBy);
        }

        let tile_count = self.tiles.len() as u64;
        let base = self
            .seed
            .wrapping_add((pass as u64).wrapping_mul(tile_count));

        let scene = self.scene;
        let tracer = &self.tracer;
        let config = &self.config;
        let results: Vec<TileResult> = self
            .tiles
            .par_iter()
            .map(|tile| {
                let mut rng = Random::new(base.wrapping_add(tile.index as u64));
                render_tile(tile, scene, tracer, config, &mut rng)
            })
            .collect();

        let samples = config.samples_per_pass() as u64;
        let mut depth = DepthStats::default();
        for result in &results {
            let tile = &self.tiles[result.tile_index];
            for (&(x, y), &sum) in tile.pixels.iter().zip(&result.sums) {
                self.film.pixel_mut(x, y).accumulate_sum(sum, samples);
            }
            depth.merge(&result.depth);
        }

        let stats = PassStats {
            pass,
            elapsed: start.elapsed(),
            depth,
        };
        log::debug!(
            "Pass {} in {:.2?}: depth min {} max {} mean {:.2}",
            pass,
            stats.elapsed,
            depth.min,
            depth.max,
            depth.mean()
        );
        stats
    }
}

/// Trace every sample of one tile.
pub fn render_tile(
    tile: &Tile,
    scene: &Scene,
    tracer: &PathTracer,
    config: &RenderConfig,
    rng: &mut Random,
) -> TileResult {
    tile.set_state(TileState::Processing);

    let size = DVec2::new(config.width as f64, config.height as f64);
    let ss = config.pixel_sub_samples;
    let inv_ss = 1.0 / ss as f64;

    let mut depth = DepthStats::default();
    let mut sums = Vec::with_capacity(tile.pixel_count());
    for &(x, y) in &tile.pixels {
        let p = DVec2::new(x as f64, y as f64);
        let mut sum = DVec3::ZERO;

        for sy in 0..ss {
            for sx in 0..ss {
                let sub = DVec2::new(sx as f64, sy as f64);
                for _ in 0..config.samples_per_pixel {
                    let jitter = DVec2::new(rng.next_f64_co(), rng.next_f64_co());
                    let s = p + (sub + jitter) * inv_ss;
                    let n = s / size * 2.0 - 1.0;

                    let (radiance, d) = tracer.trace(n.x, n.y, scene, rng);
                    sum += radiance;
                    depth.record(d);
                }
            }
        }
        sums.push(sum);
    }

    tile.set_state(TileState::Done);
    TileResult {
        tile_index: tile.index,
        sums,
        depth,
    }
}
