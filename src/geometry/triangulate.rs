// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Constrained retriangulation of a split mesh face

use crate::error::BooleanFailure;
use ahash::{AHashMap, AHashSet};
use nalgebra::{Point3, Vector3};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Everything that cuts one face, in global point ids.
#[derive(Debug, Clone, Default)]
pub struct FaceSplit {
    pub corners: [usize; 3],
    /// Points strictly inside edge `i` (corner `i` to corner `i + 1`)
    pub edge_points: [Vec<usize>; 3],
    /// Points strictly inside the face
    pub interior: Vec<usize>,
    /// Segments that must appear as edges of the result
    pub constraints: Vec<[usize; 2]>,
}

impl FaceSplit {
    pub fn new(corners: [usize; 3]) -> Self {
        Self {
            corners,
            ..Self::default()
        }
    }

    pub fn is_trivial(&self) -> bool {
        self.edge_points.iter().all(Vec::is_empty)
            && self.interior.is_empty()
            && self.constraints.is_empty()
    }
}

/// Retriangulate a face so that every split point is a vertex and every
/// constraint is covered by edges. Output triangles keep the winding of
/// the original face.
pub fn retriangulate(
    split: &FaceSplit,
    points: &[Point3<f64>],
) -> Result<Vec<[usize; 3]>, BooleanFailure> {
    if split.is_trivial() {
        return Ok(vec![split.corners]);
    }

    let [p0, p1, p2] = split.corners.map(|i| points[i]);
    let normal = (p1 - p0).cross(&(p2 - p0));
    if normal.norm() <= f64::EPSILON {
        return Ok(vec![split.corners]);
    }
    // u along the first edge, v = n x u keeps the 2D winding counter-clockwise
    let u: Vector3<f64> = (p1 - p0).normalize();
    let v = normal.normalize().cross(&u);
    let project = |p: &Point3<f64>| {
        let d = p - p0;
        SpadePoint2::new(d.dot(&u), d.dot(&v))
    };

    // bit e set when the point lies on edge e
    let mut on_edge: AHashMap<usize, u8> = AHashMap::new();
    for corner in 0..3 {
        *on_edge.entry(split.corners[corner]).or_insert(0) |= (1 << corner) | (1 << ((corner + 2) % 3));
    }

    let mut chains: [Vec<usize>; 3] = Default::default();
    for (edge, chain) in chains.iter_mut().enumerate() {
        let start = split.corners[edge];
        let end = split.corners[(edge + 1) % 3];
        let direction = points[end] - points[start];

        let mut inner: Vec<(f64, usize)> = split.edge_points[edge]
            .iter()
            .filter(|&&id| id != start && id != end)
            .map(|&id| ((points[id] - points[start]).dot(&direction), id))
            .collect();
        inner.sort_by(|a, b| a.0.total_cmp(&b.0));
        inner.dedup_by_key(|(_, id)| *id);

        chain.push(start);
        for (_, id) in inner {
            *on_edge.entry(id).or_insert(0) |= 1 << edge;
            chain.push(id);
        }
        chain.push(end);
    }

    let mut cdt = Cdt::new();
    let mut handles: AHashMap<usize, spade::handles::FixedVertexHandle> = AHashMap::new();
    let mut global_of: Vec<usize> = Vec::new();

    let ordered = split
        .corners
        .iter()
        .chain(chains.iter().flatten())
        .chain(split.interior.iter())
        .chain(split.constraints.iter().flatten());
    for &id in ordered {
        if handles.contains_key(&id) {
            continue;
        }
        let handle = cdt
            .insert(project(&points[id]))
            .map_err(|e: InsertionError| BooleanFailure::Triangulation(format!("CDT insert: {e}")))?;
        if handle.index() == global_of.len() {
            global_of.push(id);
        }
        handles.insert(id, handle);
    }

    let boundary = chains
        .iter()
        .flat_map(|chain| chain.windows(2).map(|w| [w[0], w[1]]));
    let mut added: AHashSet<(usize, usize)> = AHashSet::new();
    for [from, to] in boundary.chain(split.constraints.iter().copied()) {
        let (h_from, h_to) = (handles[&from], handles[&to]);
        if h_from == h_to {
            continue;
        }
        let key = (
            h_from.index().min(h_to.index()),
            h_from.index().max(h_to.index()),
        );
        if added.contains(&key) {
            continue;
        }
        if cdt.can_add_constraint(h_from, h_to) {
            cdt.add_constraint(h_from, h_to);
            added.insert(key);
        } else {
            tracing::debug!(from, to, "skipping constraint crossing an existing one");
        }
    }

    let mut triangles = Vec::with_capacity(cdt.num_inner_faces());
    for face in cdt.inner_faces() {
        let ids = face.vertices().map(|vh| global_of[vh.fix().index()]);
        if ids[0] == ids[1] || ids[1] == ids[2] || ids[0] == ids[2] {
            continue;
        }
        // slivers between points of a single original edge
        let shared = ids
            .iter()
            .fold(0b111u8, |mask, id| mask & on_edge.get(id).copied().unwrap_or(0));
        if shared != 0 {
            continue;
        }
        triangles.push(ids);
    }

    Ok(triangles)
}
