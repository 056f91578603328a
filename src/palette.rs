//! Palette quantization.
//!
//! Two ways of turning an RGB frame into palette indices:
//!
//! - [`PaletteMode::Fast`]: an octree over the frame's colors is folded from
//!   the deepest level up until at most 32 leaves remain; each leaf becomes a
//!   palette entry.
//! - [`PaletteMode::Adaptive`]: the `gif` crate's own frame builder. Frames
//!   with at most 256 distinct colors get an exact palette, richer frames go
//!   through NeuQuant.
//!
//! The encoder reuses the adaptive path to index RGB frames produced by
//! vector quantization.

use std::collections::HashMap;

use gif::Frame;
use image::RgbImage;

use crate::config::{FAST_PALETTE_COLORS, MAX_PALETTE_COLORS, PaletteMode};
use crate::error::GifcastError;
use crate::gif::gif_dimension;

/// NeuQuant sampling factor: 1 is slowest and best, 30 fastest.
const NEUQUANT_SPEED: i32 = 10;

/// Palette indices (one per pixel, row-major) and the palette itself.
pub type Indexed = (Vec<u8>, Vec<[u8; 3]>);

/// Quantize `image` with the given palette mode.
///
/// # Errors
///
/// Returns [`GifcastError::Encode`] if the adaptive palette is requested for
/// a frame wider or taller than a GIF can hold.
pub fn quantize(image: &RgbImage, mode: PaletteMode) -> Result<Indexed, GifcastError> {
    match mode {
        PaletteMode::Fast => Ok(octree(image, FAST_PALETTE_COLORS)),
        PaletteMode::Adaptive => adaptive(image),
    }
}

/// Index `image` into at most 256 colors with [`gif::Frame::from_rgb_speed`].
///
/// The palette is exact whenever the frame has 256 distinct colors or fewer.
///
/// # Errors
///
/// Returns [`GifcastError::Encode`] if a side exceeds 65535 pixels.
pub fn adaptive(image: &RgbImage) -> Result<Indexed, GifcastError> {
    let width = gif_dimension(image.width())?;
    let height = gif_dimension(image.height())?;
    let frame = Frame::from_rgb_speed(width, height, image.as_raw(), NEUQUANT_SPEED);

    let mut palette: Vec<[u8; 3]> = frame
        .palette
        .unwrap_or_default()
        .chunks_exact(3)
        .map(|rgb| [rgb[0], rgb[1], rgb[2]])
        .collect();
    if palette.is_empty() {
        palette.push([0, 0, 0]);
    }
    debug_assert!(palette.len() <= MAX_PALETTE_COLORS);
    Ok((frame.buffer.into_owned(), palette))
}

/// Colors and their pixel counts, sorted by color.
fn histogram(image: &RgbImage) -> Vec<([u8; 3], u32)> {
    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for px in image.as_raw().chunks_exact(3) {
        *counts.entry([px[0], px[1], px[2]]).or_insert(0) += 1;
    }
    let mut entries: Vec<_> = counts.into_iter().collect();
    entries.sort_unstable_by_key(|&(color, _)| color);
    entries
}

// ── octree ─────────────────────────────────────────────────────────

const OCTREE_DEPTH: usize = 8;

#[derive(Default)]
struct OctreeNode {
    children: [Option<usize>; 8],
    leaf: bool,
    /// Pixels in this subtree.
    population: u64,
    /// Channel sums of pixels folded into this node (leaves only).
    sums: [u64; 3],
    palette_entry: u8,
}

struct Octree {
    nodes: Vec<OctreeNode>,
    /// Interior nodes per depth, candidates for folding. The root sits at
    /// depth 0.
    levels: Vec<Vec<usize>>,
    leaves: usize,
}

fn child_slot(color: [u8; 3], depth: usize) -> usize {
    let shift = 7 - depth;
    (((color[0] >> shift) & 1) << 2 | ((color[1] >> shift) & 1) << 1 | ((color[2] >> shift) & 1))
        as usize
}

impl Octree {
    fn new() -> Self {
        let mut levels = vec![Vec::new(); OCTREE_DEPTH];
        levels[0].push(0);
        Self {
            nodes: vec![OctreeNode::default()],
            levels,
            leaves: 0,
        }
    }

    fn insert(&mut self, color: [u8; 3], count: u32) {
        let mut node = 0;
        for depth in 0..OCTREE_DEPTH {
            self.nodes[node].population += count as u64;
            let slot = child_slot(color, depth);
            node = match self.nodes[node].children[slot] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(OctreeNode::default());
                    self.nodes[node].children[slot] = Some(child);
                    if depth + 1 < OCTREE_DEPTH {
                        self.levels[depth + 1].push(child);
                    } else {
                        self.nodes[child].leaf = true;
                        self.leaves += 1;
                    }
                    child
                }
            };
        }
        let leaf = &mut self.nodes[node];
        leaf.population += count as u64;
        for channel in 0..3 {
            leaf.sums[channel] += color[channel] as u64 * count as u64;
        }
    }

    /// Fold interior nodes into leaves, deepest level first and least
    /// populated first within a level, until at most `max_leaves` remain.
    ///
    /// Each level is sorted once. Nodes with a single child are folded on
    /// the way without changing the leaf count.
    fn reduce(&mut self, max_leaves: usize) {
        for depth in (0..OCTREE_DEPTH).rev() {
            if self.leaves <= max_leaves {
                return;
            }
            let mut level = std::mem::take(&mut self.levels[depth]);
            level.sort_unstable_by_key(|&node| (self.nodes[node].population, node));
            for node in level {
                if self.leaves <= max_leaves {
                    return;
                }
                self.fold(node);
            }
        }
    }

    /// Merge the children of `node`, all leaves, into `node`.
    fn fold(&mut self, node: usize) {
        let mut sums = [0u64; 3];
        let mut folded = 0;
        for slot in 0..8 {
            if let Some(child) = self.nodes[node].children[slot].take() {
                for channel in 0..3 {
                    sums[channel] += self.nodes[child].sums[channel];
                }
                folded += 1;
            }
        }
        let target = &mut self.nodes[node];
        target.sums = sums;
        target.leaf = true;
        self.leaves = self.leaves + 1 - folded;
    }

    fn assign_entries(&mut self) -> Vec<[u8; 3]> {
        let mut palette = Vec::with_capacity(self.leaves);
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            if self.nodes[node].leaf {
                let population = self.nodes[node].population.max(1);
                let color = self.nodes[node]
                    .sums
                    .map(|sum| ((sum + population / 2) / population) as u8);
                self.nodes[node].palette_entry = palette.len() as u8;
                palette.push(color);
                continue;
            }
            stack.extend(self.nodes[node].children.iter().rev().flatten());
        }
        palette
    }

    fn lookup(&self, color: [u8; 3]) -> u8 {
        let mut node = 0;
        for depth in 0..OCTREE_DEPTH {
            if self.nodes[node].leaf {
                break;
            }
            match self.nodes[node].children[child_slot(color, depth)] {
                Some(child) => node = child,
                None => break,
            }
        }
        self.nodes[node].palette_entry
    }
}

/// Octree quantization to at most `max_colors` entries.
pub fn octree(image: &RgbImage, max_colors: usize) -> Indexed {
    let max_colors = max_colors.clamp(1, MAX_PALETTE_COLORS);
    let entries = histogram(image);
    if entries.is_empty() {
        return (Vec::new(), vec![[0, 0, 0]]);
    }

    let mut tree = Octree::new();
    for &(color, count) in &entries {
        tree.insert(color, count);
    }
    tree.reduce(max_colors);

    let palette = tree.assign_entries();
    let pixels = image
        .as_raw()
        .chunks_exact(3)
        .map(|px| tree.lookup([px[0], px[1], px[2]]))
        .collect();
    (pixels, palette)
}
