//! Principal component projection to two dimensions.
//!
//! Vectors are centered on their mean and projected onto the two leading
//! principal axes. Each axis comes from power iteration on the implicit
//! covariance `Xᵀ(Xv)`, so the `d × d` matrix is never materialized. The second
//! axis is kept orthogonal to the first by Gram-Schmidt on every iteration.
//!
//! Ids are walked in sorted order and each start vector is picked from the
//! rows by a fixed rule, so the result does not depend on `HashMap` iteration
//! order.

use crate::{Layout, LayoutError, Point2};
use std::collections::HashMap;
use tracing::debug;

/// Below this fraction of the data's squared magnitude an axis carries no variance.
const DEGENERATE_RATIO: f64 = 1e-12;

/// Tuning knobs for [`compute_layout_with_options`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Power iteration cap per axis.
    pub max_iterations: usize,
    /// Stop once no axis component moves more than this between iterations.
    pub tolerance: f64,
    /// Scale coordinates uniformly so the largest absolute value is 1.0.
    pub normalize: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-9,
            normalize: true,
        }
    }
}

/// Projects embeddings to 2D using [`LayoutOptions::default`].
///
/// The output has exactly the input's keys. Empty input yields an empty layout.
pub fn compute_layout_from_embeddings(
    embeddings: &HashMap<String, Vec<f32>>,
) -> Result<Layout, LayoutError> {
    compute_layout_with_options(embeddings, &LayoutOptions::default())
}

/// Projects embeddings to 2D.
///
/// # Errors
/// Rejects empty vectors, non-finite components and mixed dimensionality.
/// Vectors are never padded or truncated.
pub fn compute_layout_with_options(
    embeddings: &HashMap<String, Vec<f32>>,
    options: &LayoutOptions,
) -> Result<Layout, LayoutError> {
    if embeddings.is_empty() {
        return Ok(Layout::new());
    }

    let mut ids: Vec<&String> = embeddings.keys().collect();
    ids.sort();

    let vectors: Vec<&[f32]> = ids.iter().map(|id| embeddings[*id].as_slice()).collect();
    let dim = validate(&ids, &vectors)?;

    let rows = center(&vectors, dim);
    let magnitude: f64 = vectors
        .iter()
        .flat_map(|v| v.iter())
        .map(|&x| (x as f64) * (x as f64))
        .sum();
    let floor = magnitude * DEGENERATE_RATIO;

    let first = principal_axis(&rows, &[], floor, options);
    let second = first
        .as_ref()
        .and_then(|axis| principal_axis(&rows, std::slice::from_ref(axis), floor, options));

    let mut points: Vec<Point2> = rows
        .iter()
        .map(|row| {
            let x = first.as_deref().map_or(0.0, |axis| dot(row, axis));
            let y = second.as_deref().map_or(0.0, |axis| dot(row, axis));
            Point2::new(x, y)
        })
        .collect();

    if options.normalize {
        normalize_extent(&mut points);
    }

    debug!(
        points = points.len(),
        dim,
        axes = usize::from(first.is_some()) + usize::from(second.is_some()),
        "Computed layout"
    );

    Ok(ids.into_iter().cloned().zip(points).collect())
}

/// Checks every vector against the first one's dimensionality.
fn validate(ids: &[&String], vectors: &[&[f32]]) -> Result<usize, LayoutError> {
    let dim = vectors[0].len();
    for (id, v) in ids.iter().zip(vectors) {
        if v.is_empty() {
            return Err(LayoutError::EmptyVector { id: (*id).clone() });
        }
        if v.len() != dim {
            return Err(LayoutError::DimensionMismatch {
                id: (*id).clone(),
                expected: dim,
                got: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(LayoutError::NonFiniteValue { id: (*id).clone() });
        }
    }
    Ok(dim)
}

fn center(vectors: &[&[f32]], dim: usize) -> Vec<Vec<f64>> {
    let n = vectors.len() as f64;
    let mut mean = vec![0.0f64; dim];
    for v in vectors {
        for (m, &x) in mean.iter_mut().zip(v.iter()) {
            *m += x as f64;
        }
    }
    for m in mean.iter_mut() {
        *m /= n;
    }

    vectors
        .iter()
        .map(|v| v.iter().zip(&mean).map(|(&x, m)| x as f64 - m).collect())
        .collect()
}

/// Leading eigenvector of the covariance restricted to the complement of `previous`.
///
/// Returns `None` when no variance is left in that subspace.
fn principal_axis(
    rows: &[Vec<f64>],
    previous: &[Vec<f64>],
    floor: f64,
    options: &LayoutOptions,
) -> Option<Vec<f64>> {
    let mut axis = start_vector(rows, previous)?;

    for _ in 0..options.max_iterations {
        let mut next = covariance_mul(rows, &axis);
        orthogonalize(&mut next, previous);

        let norm = l2(&next);
        if norm <= floor {
            return None;
        }
        for x in next.iter_mut() {
            *x /= norm;
        }

        let delta = next
            .iter()
            .zip(&axis)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        axis = next;
        if delta < options.tolerance {
            break;
        }
    }

    fix_sign(&mut axis);
    Some(axis)
}

/// Centered row with the largest residual outside `previous`, as a unit vector.
///
/// A start taken from the data always has a component along the spread, so
/// power iteration cannot stall at zero. Rows are in sorted id order and the
/// first one wins ties.
fn start_vector(rows: &[Vec<f64>], previous: &[Vec<f64>]) -> Option<Vec<f64>> {
    let mut best: Option<(f64, Vec<f64>)> = None;
    for row in rows {
        let mut residual = row.clone();
        orthogonalize(&mut residual, previous);
        let norm = l2(&residual);
        if best.as_ref().map_or(true, |(top, _)| norm > *top) {
            best = Some((norm, residual));
        }
    }

    let (_, mut axis) = best.filter(|(norm, _)| *norm > 0.0)?;
    normalize_vector(&mut axis).then_some(axis)
}

/// `Xᵀ(Xv)`
fn covariance_mul(rows: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0f64; v.len()];
    for row in rows {
        let s = dot(row, v);
        if s == 0.0 {
            continue;
        }
        for (o, &r) in out.iter_mut().zip(row) {
            *o += s * r;
        }
    }
    out
}

fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for b in basis {
        let s = dot(v, b);
        for (x, &bx) in v.iter_mut().zip(b) {
            *x -= s * bx;
        }
    }
}

/// Returns false for a zero vector.
fn normalize_vector(v: &mut [f64]) -> bool {
    let norm = l2(v);
    if norm <= 0.0 {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// Largest-magnitude component positive; first one wins ties.
fn fix_sign(v: &mut [f64]) {
    let mut pivot = 0.0f64;
    for &x in v.iter() {
        if x.abs() > pivot.abs() {
            pivot = x;
        }
    }
    if pivot < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

fn normalize_extent(points: &mut [Point2]) {
    let extent = points
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(0.0f64, f64::max);
    if extent > 0.0 && extent.is_finite() {
        for p in points.iter_mut() {
            p.x /= extent;
            p.y /= extent;
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}
