//! Layout engine for the document map
//!
//! Projects document embeddings onto a plane and derives a k-nearest-neighbor
//! graph from the resulting coordinates. Everything here is pure: no storage,
//! no shared state, the same input always yields the same output.
//!
//! # Usage
//!
//! ```
//! use std::collections::HashMap;
//! use docmap_layout::{compute_layout_from_embeddings, compute_nearest_neighbors};
//!
//! let mut embeddings = HashMap::new();
//! embeddings.insert("a".to_string(), vec![0.0, 0.0, 1.0]);
//! embeddings.insert("b".to_string(), vec![0.0, 1.0, 1.0]);
//! embeddings.insert("c".to_string(), vec![5.0, 5.0, 0.0]);
//!
//! let layout = compute_layout_from_embeddings(&embeddings).unwrap();
//! let neighbors = compute_nearest_neighbors(&layout, 1);
//! assert_eq!(neighbors["a"], vec!["b".to_string()]);
//! ```

mod error;
mod neighbors;
mod projection;

pub use error::LayoutError;
pub use neighbors::compute_nearest_neighbors;
pub use projection::{compute_layout_from_embeddings, compute_layout_with_options, LayoutOptions};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A document's position on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// id → coordinate
pub type Layout = HashMap<String, Point2>;

/// id → other ids ordered nearest first
pub type NeighborGraph = HashMap<String, Vec<String>>;

/// Coordinates plus neighbor lists, as handed to the visualization layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutGraph {
    pub coordinates: Layout,
    pub neighbors: NeighborGraph,
}

/// Project `embeddings` and build the neighbor graph in one call
pub fn build_layout_graph(
    embeddings: &HashMap<String, Vec<f32>>,
    k: usize,
    options: &LayoutOptions,
) -> Result<LayoutGraph, LayoutError> {
    let coordinates = compute_layout_with_options(embeddings, options)?;
    let neighbors = compute_nearest_neighbors(&coordinates, k);
    Ok(LayoutGraph {
        coordinates,
        neighbors,
    })
}
