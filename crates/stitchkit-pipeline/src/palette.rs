//! Palette reduction: bound the number of distinct colors in a grid.
//!
//! If the grid already has at most `max_colors` distinct colors the
//! reduction is the identity. Otherwise the distinct colors are
//! clustered with weighted k-means in RGB space, where each color's
//! weight is the number of cells using it.
//!
//! The clustering is fully deterministic:
//!
//! - seeds are the `max_colors` most frequent colors (ties by ascending
//!   hex key),
//! - each color joins its nearest centroid (ties to the lowest cluster
//!   index),
//! - a cluster left empty takes the member farthest from its centroid
//!   out of some cluster with at least two members,
//! - iteration stops when the assignment is stable or after
//!   [`MAX_ITERATIONS`].
//!
//! Each cluster's representative is its weighted mean rounded per
//! channel. Representatives are kept pairwise distinct, so a reduction
//! always yields exactly `min(distinct, max_colors)` palette colors.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{PipelineError, Rgb, StitchGrid};

/// Upper bound on k-means assignment/update rounds.
pub const MAX_ITERATIONS: usize = 32;

/// A distinct color and the number of cells using it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCount {
    /// The exact cell color.
    pub color: Rgb,
    /// How many cells have this color.
    pub count: usize,
}

/// Count distinct colors in a grid.
///
/// The result is sorted by descending count, ties broken by ascending
/// hex key, so it is independent of hash or map iteration order.
#[must_use]
pub fn histogram(grid: &StitchGrid) -> Vec<ColorCount> {
    let mut counts: BTreeMap<Rgb, usize> = BTreeMap::new();
    for &color in grid.cells() {
        *counts.entry(color).or_insert(0) += 1;
    }
    let mut histogram: Vec<ColorCount> = counts
        .into_iter()
        .map(|(color, count)| ColorCount { color, count })
        .collect();
    histogram.sort_by(|a, b| b.count.cmp(&a.count).then(a.color.cmp(&b.color)));
    histogram
}

/// The outcome of reducing a grid's colors to a bounded palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteReduction {
    representatives: Vec<Rgb>,
    assignments: BTreeMap<Rgb, usize>,
    distinct_colors: usize,
    iterations: usize,
}

impl PaletteReduction {
    /// Representative colors, one per cluster, pairwise distinct.
    #[must_use]
    pub fn representatives(&self) -> &[Rgb] {
        &self.representatives
    }

    /// Number of distinct colors in the grid before reduction.
    #[must_use]
    pub const fn distinct_colors(&self) -> usize {
        self.distinct_colors
    }

    /// Number of k-means rounds run (zero for an identity reduction).
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns `true` if no color was merged with another.
    #[must_use]
    pub const fn is_lossless(&self) -> bool {
        self.iterations == 0
    }

    /// The representative for a color seen during reduction.
    #[must_use]
    pub fn representative_for(&self, color: Rgb) -> Option<Rgb> {
        self.assignments
            .get(&color)
            .and_then(|&cluster| self.representatives.get(cluster))
            .copied()
    }

    /// Replace every cell's color with its representative.
    ///
    /// Colors that were not part of the reduced grid map to the nearest
    /// representative (ties to the earlier one).
    #[must_use]
    pub fn apply(&self, grid: &StitchGrid) -> StitchGrid {
        grid.map(|color| {
            self.representative_for(color)
                .unwrap_or_else(|| self.nearest_representative(color))
        })
    }

    fn nearest_representative(&self, color: Rgb) -> Rgb {
        let point = color.to_point();
        self.representatives
            .iter()
            .copied()
            .fold(None, |best: Option<(Rgb, f64)>, candidate| {
                let distance = candidate.distance_squared(point);
                match best {
                    Some((_, best_distance)) if best_distance <= distance => best,
                    _ => Some((candidate, distance)),
                }
            })
            .map_or(color, |(rep, _)| rep)
    }
}

/// Reduce the grid's colors to at most `max_colors` representatives.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidPaletteSize`] if `max_colors` is zero
/// and [`PipelineError::EmptyInput`] if the grid has no cells.
pub fn reduce(grid: &StitchGrid, max_colors: u32) -> Result<PaletteReduction, PipelineError> {
    if max_colors == 0 {
        return Err(PipelineError::InvalidPaletteSize(max_colors));
    }
    if grid.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let histogram = histogram(grid);
    let k = usize::try_from(max_colors).unwrap_or(usize::MAX);

    if histogram.len() <= k {
        let representatives: Vec<Rgb> = histogram.iter().map(|c| c.color).collect();
        let assignments = representatives
            .iter()
            .enumerate()
            .map(|(cluster, &color)| (color, cluster))
            .collect();
        return Ok(PaletteReduction {
            representatives,
            assignments,
            distinct_colors: histogram.len(),
            iterations: 0,
        });
    }

    let clustering = kmeans(&histogram, k);
    tracing::debug!(
        distinct = histogram.len(),
        k,
        iterations = clustering.iterations,
        "k-means palette reduction finished",
    );

    let representatives = distinct_representatives(&histogram, &clustering);
    let assignments = histogram
        .iter()
        .zip(&clustering.assignment)
        .map(|(entry, &cluster)| (entry.color, cluster))
        .collect();

    Ok(PaletteReduction {
        representatives,
        assignments,
        distinct_colors: histogram.len(),
        iterations: clustering.iterations,
    })
}

type Centroid = [f64; 3];

/// Converged k-means state. `assignment[i]` is the cluster of
/// `histogram[i]`; every cluster has at least one member.
struct Clustering {
    centroids: Vec<Centroid>,
    assignment: Vec<usize>,
    iterations: usize,
}

/// Weighted k-means over a histogram with more than `k` entries.
fn kmeans(histogram: &[ColorCount], k: usize) -> Clustering {
    let mut centroids: Vec<Centroid> = histogram
        .iter()
        .take(k)
        .map(|entry| entry.color.to_point())
        .collect();
    let mut assignment: Vec<usize> = Vec::new();
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;
        let mut next = assign(histogram, &centroids);
        repair_empty_clusters(histogram, &centroids, &mut next, k);
        centroids = update_centroids(histogram, &next, &centroids);
        let converged = next == assignment;
        assignment = next;
        if converged {
            break;
        }
    }

    Clustering {
        centroids,
        assignment,
        iterations,
    }
}

/// Nearest centroid for every histogram entry, ties to the lowest index.
fn assign(histogram: &[ColorCount], centroids: &[Centroid]) -> Vec<usize> {
    histogram
        .iter()
        .map(|entry| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (cluster, &centroid) in centroids.iter().enumerate() {
                let distance = entry.color.distance_squared(centroid);
                if distance < best_distance {
                    best = cluster;
                    best_distance = distance;
                }
            }
            best
        })
        .collect()
}

/// Give every empty cluster one member.
///
/// The donor is the color farthest from its current centroid among
/// clusters with at least two members, ties broken by ascending hex.
/// Since there are more distinct colors than clusters, such a donor
/// always exists while any cluster is empty.
fn repair_empty_clusters(
    histogram: &[ColorCount],
    centroids: &[Centroid],
    assignment: &mut [usize],
    k: usize,
) {
    let mut sizes = vec![0usize; k];
    for &cluster in assignment.iter() {
        sizes[cluster] += 1;
    }

    for empty in 0..k {
        if sizes[empty] != 0 {
            continue;
        }

        let mut donor: Option<(usize, f64)> = None;
        for (index, &cluster) in assignment.iter().enumerate() {
            if sizes[cluster] < 2 {
                continue;
            }
            let distance = histogram[index].color.distance_squared(centroids[cluster]);
            let better = match donor {
                None => true,
                Some((best, best_distance)) => match distance.total_cmp(&best_distance) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Equal => histogram[index].color < histogram[best].color,
                    std::cmp::Ordering::Less => false,
                },
            };
            if better {
                donor = Some((index, distance));
            }
        }

        let Some((index, _)) = donor else {
            break;
        };
        sizes[assignment[index]] -= 1;
        sizes[empty] += 1;
        assignment[index] = empty;
    }
}

/// Weighted mean of each cluster's members. A cluster without members
/// keeps its previous centroid.
fn update_centroids(
    histogram: &[ColorCount],
    assignment: &[usize],
    previous: &[Centroid],
) -> Vec<Centroid> {
    let mut sums = vec![[0.0f64; 3]; previous.len()];
    let mut weights = vec![0.0f64; previous.len()];

    for (entry, &cluster) in histogram.iter().zip(assignment) {
        // Cell counts are far below 2^52; the conversion is exact.
        #[allow(clippy::cast_precision_loss)]
        let weight = entry.count as f64;
        for (sum, value) in sums[cluster].iter_mut().zip(entry.color.to_point()) {
            *sum += value * weight;
        }
        weights[cluster] += weight;
    }

    previous
        .iter()
        .enumerate()
        .map(|(cluster, &old)| {
            let weight = weights[cluster];
            if weight > 0.0 {
                let sum = sums[cluster];
                [sum[0] / weight, sum[1] / weight, sum[2] / weight]
            } else {
                old
            }
        })
        .collect()
}

/// Round a centroid to the nearest 8-bit color.
fn round_centroid(centroid: Centroid) -> Rgb {
    // Clamped to [0, 255] before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    Rgb::new(
        channel(centroid[0]),
        channel(centroid[1]),
        channel(centroid[2]),
    )
}

/// Closest color to `centroid` not in `used`, ties by ascending hex.
fn closest_unused(
    candidates: impl Iterator<Item = Rgb>,
    centroid: Centroid,
    used: &BTreeSet<Rgb>,
) -> Option<Rgb> {
    candidates
        .filter(|color| !used.contains(color))
        .map(|color| (color, color.distance_squared(centroid)))
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(color, _)| color)
}

/// Rounded cluster means, with collisions resolved so every cluster
/// ends up with its own color.
///
/// A cluster whose rounded mean is already taken by an earlier cluster
/// uses its closest unused member color instead, and failing that the
/// closest unused color from the whole histogram.
fn distinct_representatives(histogram: &[ColorCount], clustering: &Clustering) -> Vec<Rgb> {
    let mut used = BTreeSet::new();
    let mut representatives = Vec::with_capacity(clustering.centroids.len());

    for (cluster, &centroid) in clustering.centroids.iter().enumerate() {
        let mut representative = round_centroid(centroid);
        if used.contains(&representative) {
            let members = histogram
                .iter()
                .zip(&clustering.assignment)
                .filter(|&(_, &c)| c == cluster)
                .map(|(entry, _)| entry.color);
            representative = closest_unused(members, centroid, &used)
                .or_else(|| closest_unused(histogram.iter().map(|e| e.color), centroid, &used))
                .unwrap_or(representative);
        }
        used.insert(representative);
        representatives.push(representative);
    }

    representatives
}
