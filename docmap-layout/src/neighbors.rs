//! k-nearest-neighbor lists over 2D coordinates.

use crate::{Layout, NeighborGraph, Point2};
use tracing::debug;

/// For each id, the other ids ordered by ascending Euclidean distance.
///
/// Ties (including duplicate coordinates) are broken by id, so the output is
/// reproducible. Each list holds `min(k, n - 1)` entries: `k == 0` gives empty
/// lists, a `k` beyond the number of other points is clamped. Brute force,
/// O(n² log n).
pub fn compute_nearest_neighbors(layout: &Layout, k: usize) -> NeighborGraph {
    let mut points: Vec<(&String, &Point2)> = layout.iter().collect();
    points.sort_by(|a, b| a.0.cmp(b.0));

    let take = k.min(points.len().saturating_sub(1));

    let graph: NeighborGraph = points
        .iter()
        .map(|&(id, origin)| {
            if take == 0 {
                return (id.clone(), Vec::new());
            }

            let mut others: Vec<(f64, &String)> = points
                .iter()
                .filter(|(other, _)| *other != id)
                .map(|&(other, p)| (origin.distance_squared(p), other))
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

            let nearest = others
                .into_iter()
                .take(take)
                .map(|(_, other)| other.clone())
                .collect();
            (id.clone(), nearest)
        })
        .collect();

    debug!(points = points.len(), k, per_point = take, "Computed nearest neighbors");
    graph
}
