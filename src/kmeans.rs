//! Mini-batch k-means over RGB pixels.
//!
//! Each frame is clustered on its own. Centers are seeded with k-means++ on a
//! random sample, refined with fixed-size random batches using per-center
//! learning rates of `1 / count`, and every pixel is finally replaced by its
//! nearest center rounded to integer channels.
//!
//! The random generator is seeded with a constant so a given frame always
//! quantizes the same way.
//!
//! This module is available when the `vector-quantization` feature is enabled.

use std::collections::HashSet;

use image::RgbImage;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Pixels drawn per refinement step.
pub const BATCH_SIZE: usize = 1024;

/// Upper bound on refinement steps.
pub const MAX_STEPS: usize = 100;

/// Consecutive low-movement steps after which refinement stops early.
const PATIENCE: usize = 10;

/// Squared center movement below which a step counts as converged.
const TOLERANCE: f32 = 1e-2;

const SEED: u64 = 0;

type Point = [f32; 3];

fn distance(a: &Point, b: &Point) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

fn nearest(centers: &[Point], point: &Point) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (index, center) in centers.iter().enumerate() {
        let d = distance(center, point);
        if d < best_distance {
            best = index;
            best_distance = d;
        }
    }
    best
}

/// Replace every pixel of `image` with its cluster centroid.
///
/// When the frame has no more distinct colors than `clusters`, each color is
/// its own centroid and the frame is returned unchanged.
pub fn quantize(image: &RgbImage, clusters: usize) -> RgbImage {
    let clusters = clusters.max(1);
    let raw = image.as_raw();
    if raw.is_empty() || distinct_colors_at_most(raw, clusters) {
        return image.clone();
    }

    let points: Vec<Point> = raw
        .chunks_exact(3)
        .map(|px| [px[0] as f32, px[1] as f32, px[2] as f32])
        .collect();

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut centers = seed_centers(&points, clusters, &mut rng);
    refine(&points, &mut centers, &mut rng);

    let palette: Vec<[u8; 3]> = centers
        .iter()
        .map(|center| center.map(|channel| channel.round().clamp(0.0, 255.0) as u8))
        .collect();

    let mut output = Vec::with_capacity(raw.len());
    for point in &points {
        output.extend_from_slice(&palette[nearest(&centers, point)]);
    }

    let (width, height) = image.dimensions();
    RgbImage::from_raw(width, height, output).unwrap_or_else(|| image.clone())
}

fn distinct_colors_at_most(raw: &[u8], limit: usize) -> bool {
    let mut seen = HashSet::with_capacity(limit + 1);
    for px in raw.chunks_exact(3) {
        seen.insert([px[0], px[1], px[2]]);
        if seen.len() > limit {
            return false;
        }
    }
    true
}

/// k-means++ seeding on a sample of `3 * BATCH_SIZE` points.
fn seed_centers(points: &[Point], clusters: usize, rng: &mut StdRng) -> Vec<Point> {
    let sample_size = (3 * BATCH_SIZE).max(clusters).min(points.len());
    let sample: Vec<Point> = if sample_size == points.len() {
        points.to_vec()
    } else {
        (0..sample_size)
            .map(|_| points[rng.gen_range(0..points.len())])
            .collect()
    };

    let mut centers = Vec::with_capacity(clusters);
    centers.push(sample[rng.gen_range(0..sample.len())]);
    let mut closest: Vec<f32> = sample
        .iter()
        .map(|point| distance(point, &centers[0]))
        .collect();

    while centers.len() < clusters {
        let total: f32 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = sample.len() - 1;
            for (index, &weight) in closest.iter().enumerate() {
                if target < weight {
                    chosen = index;
                    break;
                }
                target -= weight;
            }
            chosen
        } else {
            // The sample is exhausted; reuse an existing point.
            rng.gen_range(0..sample.len())
        };

        let center = sample[chosen];
        for (slot, point) in closest.iter_mut().zip(&sample) {
            *slot = slot.min(distance(point, &center));
        }
        centers.push(center);
    }
    centers
}

/// Mini-batch refinement with per-center learning rates.
fn refine(points: &[Point], centers: &mut [Point], rng: &mut StdRng) {
    let batch_size = BATCH_SIZE.min(points.len());
    let mut counts = vec![0u32; centers.len()];
    let mut batch = Vec::with_capacity(batch_size);
    let mut assignments = Vec::with_capacity(batch_size);
    let mut quiet_steps = 0;

    for step in 0..MAX_STEPS {
        batch.clear();
        batch.extend((0..batch_size).map(|_| points[rng.gen_range(0..points.len())]));
        assignments.clear();
        assignments.extend(batch.iter().map(|point| nearest(centers, point)));

        let before: Vec<Point> = centers.to_vec();
        for (point, &cluster) in batch.iter().zip(&assignments) {
            counts[cluster] += 1;
            let rate = 1.0 / counts[cluster] as f32;
            let center = &mut centers[cluster];
            for channel in 0..3 {
                center[channel] += (point[channel] - center[channel]) * rate;
            }
        }

        let movement: f32 = before
            .iter()
            .zip(centers.iter())
            .map(|(old, new)| distance(old, new))
            .sum();
        if movement < TOLERANCE {
            quiet_steps += 1;
            if quiet_steps >= PATIENCE {
                log::trace!("k-means converged after {} steps", step + 1);
                break;
            }
        } else {
            quiet_steps = 0;
        }
    }
}
