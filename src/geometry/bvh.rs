// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) over mesh triangles
//! Used to find candidate face pairs and nearby faces during intersection

use super::{BoundingBox, Mesh};
use std::cmp::Ordering;

const MAX_DEPTH: usize = 32;
const LEAF_SIZE: usize = 4;

/// BVH node
#[derive(Debug, Clone)]
pub struct BVHNode {
    pub bbox: BoundingBox,
    pub left: Option<Box<BVHNode>>,
    pub right: Option<Box<BVHNode>>,
    /// Triangle indices (only for leaf nodes)
    pub triangle_indices: Vec<usize>,
}

impl BVHNode {
    fn leaf(bbox: BoundingBox, triangle_indices: Vec<usize>) -> Self {
        Self {
            bbox,
            left: None,
            right: None,
            triangle_indices,
        }
    }

    fn internal(left: Box<BVHNode>, right: Box<BVHNode>) -> Self {
        Self {
            bbox: left.bbox.union(&right.bbox),
            left: Some(left),
            right: Some(right),
            triangle_indices: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Bounding Volume Hierarchy for triangle meshes
#[derive(Debug, Clone)]
pub struct BVH {
    root: BVHNode,
}

impl BVH {
    /// Build from `(triangle_index, bbox)` pairs
    pub fn build(triangles: Vec<(usize, BoundingBox)>) -> Self {
        if triangles.is_empty() {
            return Self {
                root: BVHNode::leaf(BoundingBox::empty(), Vec::new()),
            };
        }

        Self {
            root: Self::build_recursive(triangles, 0),
        }
    }

    pub fn from_mesh(mesh: &Mesh) -> Self {
        Self::build(
            mesh.triangles
                .iter()
                .enumerate()
                .map(|(idx, tri)| {
                    let [a, b, c] = mesh.positions(tri);
                    (idx, BoundingBox::from_triangle(&a, &b, &c))
                })
                .collect(),
        )
    }

    fn build_recursive(mut triangles: Vec<(usize, BoundingBox)>, depth: usize) -> BVHNode {
        let bbox = triangles
            .iter()
            .fold(BoundingBox::empty(), |acc, (_, b)| acc.union(b));

        if triangles.len() <= LEAF_SIZE || depth >= MAX_DEPTH {
            let indices = triangles.iter().map(|(idx, _)| *idx).collect();
            return BVHNode::leaf(bbox, indices);
        }

        // Split at the median along the longest axis
        let axis = bbox.longest_axis();
        triangles.sort_by(|(_, a), (_, b)| {
            a.center()[axis]
                .partial_cmp(&b.center()[axis])
                .unwrap_or(Ordering::Equal)
        });

        let right_triangles = triangles.split_off(triangles.len() / 2);
        let left = Box::new(Self::build_recursive(triangles, depth + 1));
        let right = Box::new(Self::build_recursive(right_triangles, depth + 1));

        BVHNode::internal(left, right)
    }

    /// Triangles whose bounding boxes overlap `bbox` grown by `tolerance`
    pub fn query(&self, bbox: &BoundingBox, tolerance: f64) -> Vec<usize> {
        let mut result = Vec::new();
        Self::query_recursive(&self.root, bbox, tolerance, &mut result);
        result
    }

    fn query_recursive(node: &BVHNode, bbox: &BoundingBox, tolerance: f64, result: &mut Vec<usize>) {
        if node.bbox.is_empty() || !node.bbox.intersects(bbox, tolerance) {
            return;
        }

        if node.is_leaf() {
            result.extend_from_slice(&node.triangle_indices);
            return;
        }
        if let Some(ref left) = node.left {
            Self::query_recursive(left, bbox, tolerance, result);
        }
        if let Some(ref right) = node.right {
            Self::query_recursive(right, bbox, tolerance, result);
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        self.root.bbox
    }

    #[cfg(test)]
    pub fn root(&self) -> &BVHNode {
        &self.root
    }
}
