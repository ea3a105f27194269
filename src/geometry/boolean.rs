// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Solid intersection of closed triangle meshes
//!
//! Both surfaces are cut along their intersection curve, every face touched
//! by the curve is retriangulated, and the resulting patches are classified
//! against the other solid. Intersection points are keyed by the pair of
//! features that produced them and snapped into one shared point pool, so
//! both sides of the curve agree on vertex identity.

use super::mesh::edge_key;
use super::predicates::{
    orient2d, point_in_triangle_2d, project_on_segment, projects_into_triangle, segment_crossing_2d,
    segment_plane_point, sign_with_tolerance, winding_number, Plane,
};
use super::triangulate::{retriangulate, FaceSplit};
use super::{BoundingBox, Mesh, PointPool, Triangle, BVH};
use crate::error::{BooleanFailure, Result, VisibilityError};
use ahash::{AHashMap, AHashSet};
use nalgebra::{Point2, Point3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use tracing::{debug, info};

/// Solid intersection of two closed meshes.
///
/// Implementations must be shareable across the worker threads that
/// evaluate polygon edges.
pub trait BooleanEngine: Send + Sync {
    fn intersect(&self, a: &Mesh, b: &Mesh) -> Result<Mesh>;
}

/// Fold `intersect` left to right over `meshes`: `((m0 ∩ m1) ∩ m2) ∩ ...`
pub fn intersect_all<E, M>(engine: &E, meshes: &[M]) -> Result<Mesh>
where
    E: BooleanEngine + ?Sized,
    M: Borrow<Mesh>,
{
    let (first, rest) = meshes.split_first().ok_or_else(|| {
        VisibilityError::DegenerateInputFailure("no meshes to intersect".to_string())
    })?;

    rest.iter()
        .enumerate()
        .try_fold(first.borrow().clone(), |acc, (step, mesh)| {
            let result = engine.intersect(&acc, mesh.borrow())?;
            info!(
                step = step + 1,
                vertices = result.vertex_count(),
                triangles = result.triangle_count(),
                "intersection fold step"
            );
            Ok(result)
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanConfig {
    /// Distance under which points are considered identical
    pub weld_tolerance: f64,
    /// Reject results made of more than one shell
    pub require_single_component: bool,
    /// Use rayon for pair tests and retriangulation
    pub parallel: bool,
}

impl Default for BooleanConfig {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-6,
            require_single_component: true,
            parallel: true,
        }
    }
}

/// Counters from one intersection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BooleanStats {
    pub candidate_pairs: usize,
    pub crossing_pairs: usize,
    pub coplanar_pairs: usize,
    pub split_faces: usize,
    pub regions_a: usize,
    pub regions_b: usize,
    pub kept_faces: usize,
}

/// Where a patch of one surface lies relative to the other solid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceLocation {
    Inside,
    Outside,
    /// On the other surface with the same facing
    OnSame,
    /// On the other surface with opposite facing
    OnOpposite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    A,
    B,
}

/// Identity of a point produced while cutting the surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PointKey {
    /// An existing input vertex (global id)
    Vertex(usize),
    /// An edge of one surface crossing a face of the other
    EdgeFace {
        edge: [usize; 2],
        side: Side,
        face: usize,
    },
    /// Two coplanar edges crossing
    EdgeEdge { a: [usize; 2], b: [usize; 2] },
}

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    key: PointKey,
    position: Point3<f64>,
    /// Projection along the intersection line (transversal pairs only)
    t: f64,
}

/// Local result of one face pair, merged sequentially afterwards.
#[derive(Debug, Default)]
struct PairOutput {
    points: Vec<Endpoint>,
    on_edge: Vec<(usize, [usize; 2])>,
    interior: Vec<(Side, usize, usize)>,
    segments: Vec<(Side, usize, [usize; 2])>,
    /// Faces `(a, b)` lying in one plane
    coplanar: Option<(usize, usize)>,
}

impl PairOutput {
    fn push(&mut self, key: PointKey, position: Point3<f64>) -> usize {
        self.points.push(Endpoint {
            key,
            position,
            t: 0.0,
        });
        self.points.len() - 1
    }

    fn is_empty(&self) -> bool {
        self.on_edge.is_empty() && self.interior.is_empty() && self.segments.is_empty()
    }
}

/// Native intersection engine
#[derive(Debug, Clone, Default)]
pub struct MeshBooleanEngine {
    config: BooleanConfig,
}

/// Mesh and counters from [`MeshBooleanEngine::intersect_with_stats`]
#[derive(Debug, Clone)]
pub struct BooleanOutput {
    pub mesh: Mesh,
    pub stats: BooleanStats,
}

impl BooleanEngine for MeshBooleanEngine {
    fn intersect(&self, a: &Mesh, b: &Mesh) -> Result<Mesh> {
        Ok(self.intersect_with_stats(a, b)?.mesh)
    }
}

impl MeshBooleanEngine {
    pub fn new(config: BooleanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BooleanConfig {
        &self.config
    }

    pub fn intersect_with_stats(&self, a: &Mesh, b: &Mesh) -> Result<BooleanOutput> {
        let tol = self.config.weld_tolerance;
        let a = prepare_input(a, 'A', tol)?;
        let b = prepare_input(b, 'B', tol)?;
        let mut stats = BooleanStats::default();

        if same_geometry(&a, &b, tol) {
            debug!("inputs are identical, returning the first");
            stats.kept_faces = a.triangle_count();
            return self.finish(a, stats);
        }

        if !a.bounding_box().intersects(&b.bounding_box(), tol) {
            return Err(BooleanFailure::Disjoint.into());
        }

        // A vertices first so coincident B vertices take A ids
        let mut pool = PointPool::with_capacity(tol, a.vertex_count() + b.vertex_count());
        let a_ids: Vec<usize> = a.vertices.iter().map(|v| pool.insert(*v)).collect();
        let b_ids: Vec<usize> = b.vertices.iter().map(|v| pool.insert(*v)).collect();
        let faces_a: Vec<[usize; 3]> = a.triangles.iter().map(|t| t.indices.map(|i| a_ids[i])).collect();
        let faces_b: Vec<[usize; 3]> = b.triangles.iter().map(|t| t.indices.map(|i| b_ids[i])).collect();

        let bvh_b = BVH::from_mesh(&b);

        let corners = pool.points().to_vec();
        let pairs: Vec<(usize, usize)> = faces_a
            .iter()
            .enumerate()
            .flat_map(|(fa, face)| {
                let bbox = BoundingBox::from_points(face.iter().map(|&i| &corners[i]));
                bvh_b.query(&bbox, tol).into_iter().map(move |fb| (fa, fb))
            })
            .collect();
        stats.candidate_pairs = pairs.len();

        let test_pair = |&(fa, fb): &(usize, usize)| {
            intersect_pair(fa, fb, &faces_a[fa], &faces_b[fb], &corners, tol)
        };
        let outputs: Vec<PairOutput> = if self.config.parallel {
            pairs.par_iter().filter_map(test_pair).collect()
        } else {
            pairs.iter().filter_map(test_pair).collect()
        };
        stats.coplanar_pairs = outputs.iter().filter(|o| o.coplanar.is_some()).count();
        stats.crossing_pairs = outputs.len() - stats.coplanar_pairs;

        // faces cut as coplanar are the only ones classified as lying on the other surface
        let mut partners_a: AHashMap<usize, Vec<usize>> = AHashMap::new();
        let mut partners_b: AHashMap<usize, Vec<usize>> = AHashMap::new();
        for (fa, fb) in outputs.iter().filter_map(|o| o.coplanar) {
            partners_a.entry(fa).or_default().push(fb);
            partners_b.entry(fb).or_default().push(fa);
        }

        // Merge pair results: resolve keys to pooled ids
        let mut splits_a: Vec<FaceSplit> = faces_a.iter().map(|f| FaceSplit::new(*f)).collect();
        let mut splits_b: Vec<FaceSplit> = faces_b.iter().map(|f| FaceSplit::new(*f)).collect();
        let mut key_ids: AHashMap<PointKey, usize> = AHashMap::new();
        let mut edge_points: AHashMap<[usize; 2], Vec<usize>> = AHashMap::new();

        for output in &outputs {
            let ids: Vec<usize> = output
                .points
                .iter()
                .map(|ep| match ep.key {
                    PointKey::Vertex(id) => id,
                    key => *key_ids.entry(key).or_insert_with(|| pool.insert(ep.position)),
                })
                .collect();

            for &(local, edge) in &output.on_edge {
                let id = ids[local];
                if id != edge[0] && id != edge[1] {
                    edge_points.entry(edge).or_default().push(id);
                }
            }
            for &(side, face, local) in &output.interior {
                let split = match side {
                    Side::A => &mut splits_a[face],
                    Side::B => &mut splits_b[face],
                };
                split.interior.push(ids[local]);
            }
            for &(side, face, [l0, l1]) in &output.segments {
                let (i0, i1) = (ids[l0], ids[l1]);
                if i0 == i1 {
                    continue;
                }
                let split = match side {
                    Side::A => &mut splits_a[face],
                    Side::B => &mut splits_b[face],
                };
                split.constraints.push([i0, i1]);
            }
        }

        for split in splits_a.iter_mut().chain(splits_b.iter_mut()) {
            for edge in 0..3 {
                let key = edge_key(split.corners[edge], split.corners[(edge + 1) % 3]);
                if let Some(points) = edge_points.get(&key) {
                    split.edge_points[edge] = points.clone();
                }
            }
        }
        stats.split_faces = splits_a
            .iter()
            .chain(splits_b.iter())
            .filter(|s| !s.is_trivial())
            .count();

        if outputs.is_empty() {
            debug!("no crossing faces, resolving by containment");
        }

        let points = pool.into_points();
        let (sub_a, origin_a) = self.retriangulate_all(&splits_a, &points)?;
        let (sub_b, origin_b) = self.retriangulate_all(&splits_b, &points)?;

        let edges_a = edge_set(&sub_a);
        let edges_b = edge_set(&sub_b);
        let barrier: AHashSet<[usize; 2]> = edges_a.intersection(&edges_b).copied().collect();

        let regions_a = flood_regions(&sub_a, &barrier);
        let regions_b = flood_regions(&sub_b, &barrier);
        stats.regions_a = regions_a.len();
        stats.regions_b = regions_b.len();

        let mut kept: Vec<Triangle> = Vec::new();
        let patches_a = Patches {
            triangles: &sub_a,
            origin: &origin_a,
            partners: &partners_a,
        };
        let patches_b = Patches {
            triangles: &sub_b,
            origin: &origin_b,
            partners: &partners_b,
        };
        for region in &regions_a {
            let location = patches_a.classify(region, &points, &b, tol);
            if matches!(location, FaceLocation::Inside | FaceLocation::OnSame) {
                kept.extend(region.iter().map(|&t| Triangle::new(sub_a[t])));
            }
        }
        for region in &regions_b {
            let location = patches_b.classify(region, &points, &a, tol);
            if location == FaceLocation::Inside {
                kept.extend(region.iter().map(|&t| Triangle::new(sub_b[t])));
            }
        }
        stats.kept_faces = kept.len();

        let result = Mesh {
            vertices: points,
            triangles: kept,
        };
        self.finish(result, stats)
    }

    /// Retriangulated faces, each with the index of the input face it came from.
    fn retriangulate_all(
        &self,
        splits: &[FaceSplit],
        points: &[Point3<f64>],
    ) -> std::result::Result<(Vec<[usize; 3]>, Vec<usize>), BooleanFailure> {
        let pieces: Vec<Vec<[usize; 3]>> = if self.config.parallel {
            splits
                .par_iter()
                .map(|split| retriangulate(split, points))
                .collect::<std::result::Result<_, _>>()?
        } else {
            splits
                .iter()
                .map(|split| retriangulate(split, points))
                .collect::<std::result::Result<_, _>>()?
        };
        Ok(pieces
            .into_iter()
            .enumerate()
            .flat_map(|(face, triangles)| triangles.into_iter().map(move |t| (t, face)))
            .unzip())
    }

    /// Clean the raw result and check it is a closed, oriented solid.
    fn finish(&self, mut mesh: Mesh, stats: BooleanStats) -> Result<BooleanOutput> {
        let tol = self.config.weld_tolerance;
        mesh.remove_degenerate_faces();
        mesh.remove_unreferenced_vertices();
        mesh.weld_vertices(tol);
        mesh.remove_degenerate_faces();
        mesh.remove_unreferenced_vertices();

        if mesh.is_empty() {
            return Err(BooleanFailure::Disjoint.into());
        }

        let counts = mesh.edge_face_counts();
        let open_edges = counts.values().filter(|&&c| c == 1).count();
        let overfull_edges = counts.values().filter(|&&c| c > 2).count();
        if open_edges > 0 || overfull_edges > 0 {
            return Err(BooleanFailure::NonManifoldResult {
                open_edges,
                overfull_edges,
            }
            .into());
        }

        if !mesh.is_oriented() {
            return Err(BooleanFailure::Unoriented {
                flipped_edges: count_flipped_edges(&mesh),
            }
            .into());
        }

        let components = mesh.connected_components();
        if components > 1 && self.config.require_single_component {
            return Err(BooleanFailure::Disconnected { components }.into());
        }

        debug!(
            candidate_pairs = stats.candidate_pairs,
            crossing_pairs = stats.crossing_pairs,
            coplanar_pairs = stats.coplanar_pairs,
            split_faces = stats.split_faces,
            regions_a = stats.regions_a,
            regions_b = stats.regions_b,
            kept_faces = stats.kept_faces,
            "intersection complete"
        );
        Ok(BooleanOutput { mesh, stats })
    }
}

fn prepare_input(mesh: &Mesh, which: char, tol: f64) -> Result<Mesh> {
    let invalid = |reason: &str| -> VisibilityError {
        BooleanFailure::InvalidInput {
            which,
            reason: reason.to_string(),
        }
        .into()
    };

    let mut mesh = mesh.cleaned(tol);
    if mesh.vertex_count() < 4 {
        return Err(VisibilityError::DegenerateInputFailure(format!(
            "input mesh {which} has {} distinct vertices, a solid needs at least 4",
            mesh.vertex_count()
        )));
    }
    if !mesh.is_closed() {
        return Err(invalid("not a closed manifold"));
    }
    if !mesh.is_oriented() {
        return Err(invalid("inconsistent face orientation"));
    }
    mesh.orient_outward();
    Ok(mesh)
}

/// Same vertex set within tolerance and the same faces with the same winding.
fn same_geometry(a: &Mesh, b: &Mesh, tol: f64) -> bool {
    if a.vertex_count() != b.vertex_count() || a.triangle_count() != b.triangle_count() {
        return false;
    }

    let mut pool = PointPool::with_capacity(tol, a.vertex_count());
    for v in &a.vertices {
        pool.insert(*v);
    }
    let Some(remap) = b.vertices.iter().map(|v| pool.find(v)).collect::<Option<Vec<_>>>() else {
        return false;
    };

    let faces_a: AHashSet<[usize; 3]> = a.triangles.iter().map(|t| rotate_min_first(t.indices)).collect();
    b.triangles
        .iter()
        .all(|t| faces_a.contains(&rotate_min_first(t.indices.map(|i| remap[i]))))
}

fn rotate_min_first(t: [usize; 3]) -> [usize; 3] {
    let [a, b, c] = t;
    if a <= b && a <= c {
        [a, b, c]
    } else if b <= c {
        [b, c, a]
    } else {
        [c, a, b]
    }
}

fn count_flipped_edges(mesh: &Mesh) -> usize {
    let mut directed: AHashMap<(usize, usize), usize> = AHashMap::new();
    for triangle in &mesh.triangles {
        for edge in triangle.directed_edges() {
            *directed.entry(edge).or_insert(0) += 1;
        }
    }
    directed.values().filter(|&&count| count > 1).count()
}

fn intersect_pair(
    fa: usize,
    fb: usize,
    ids_a: &[usize; 3],
    ids_b: &[usize; 3],
    points: &[Point3<f64>],
    tol: f64,
) -> Option<PairOutput> {
    let ta = ids_a.map(|i| points[i]);
    let tb = ids_b.map(|i| points[i]);
    let plane_a = Plane::from_triangle(&ta)?;
    let plane_b = Plane::from_triangle(&tb)?;

    let da = ta.map(|p| plane_b.signed_distance(&p));
    let sa = da.map(|d| sign_with_tolerance(d, tol));
    if sa.iter().all(|&s| s == 1) || sa.iter().all(|&s| s == -1) {
        return None;
    }
    let db = tb.map(|p| plane_a.signed_distance(&p));
    let sb = db.map(|d| sign_with_tolerance(d, tol));
    if sb.iter().all(|&s| s == 1) || sb.iter().all(|&s| s == -1) {
        return None;
    }

    let output = if sa == [0, 0, 0] || sb == [0, 0, 0] {
        coplanar_pair(fa, fb, ids_a, ids_b, &ta, &tb, &plane_a, tol)
    } else {
        crossing_pair(fa, fb, ids_a, ids_b, &ta, &tb, (&da, &sa), (&db, &sb), &plane_a, &plane_b, tol)
    };
    output.filter(|o| !o.is_empty())
}

/// Points where a triangle meets the plane of a face of the other side:
/// vertices lying on it and edges crossing it.
fn plane_crossings(
    ids: &[usize; 3],
    tri: &[Point3<f64>; 3],
    dist: &[f64; 3],
    sign: &[i8; 3],
    side: Side,
    face: usize,
) -> Vec<Endpoint> {
    let mut out = Vec::with_capacity(2);
    for i in 0..3 {
        if sign[i] == 0 {
            out.push(Endpoint {
                key: PointKey::Vertex(ids[i]),
                position: tri[i],
                t: 0.0,
            });
        }
    }
    for i in 0..3 {
        let j = (i + 1) % 3;
        if sign[i] * sign[j] < 0 {
            // evaluate from the lower id so every face sharing the edge agrees
            let (u, v) = if ids[i] < ids[j] { (i, j) } else { (j, i) };
            out.push(Endpoint {
                key: PointKey::EdgeFace {
                    edge: [ids[u], ids[v]],
                    side,
                    face,
                },
                position: segment_plane_point(&tri[u], &tri[v], dist[u], dist[v]),
                t: 0.0,
            });
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn crossing_pair(
    fa: usize,
    fb: usize,
    ids_a: &[usize; 3],
    ids_b: &[usize; 3],
    ta: &[Point3<f64>; 3],
    tb: &[Point3<f64>; 3],
    (da, sa): (&[f64; 3], &[i8; 3]),
    (db, sb): (&[f64; 3], &[i8; 3]),
    plane_a: &Plane,
    plane_b: &Plane,
    tol: f64,
) -> Option<PairOutput> {
    let direction = plane_a.normal.cross(&plane_b.normal);
    if direction.norm() <= f64::EPSILON {
        return None;
    }
    let direction = direction.normalize();

    let interval = |mut ends: Vec<Endpoint>| -> Option<(Endpoint, Endpoint)> {
        if ends.len() != 2 {
            return None;
        }
        for end in &mut ends {
            end.t = direction.dot(&end.position.coords);
        }
        ends.sort_by(|x, y| x.t.total_cmp(&y.t));
        Some((ends[0], ends[1]))
    };

    let (a_lo, a_hi) = interval(plane_crossings(ids_a, ta, da, sa, Side::B, fb))?;
    let (b_lo, b_hi) = interval(plane_crossings(ids_b, tb, db, sb, Side::A, fa))?;

    let lo = if a_lo.t >= b_lo.t { a_lo } else { b_lo };
    let hi = if a_hi.t <= b_hi.t { a_hi } else { b_hi };
    if hi.t - lo.t <= tol {
        return None;
    }

    let mut output = PairOutput {
        points: vec![lo, hi],
        segments: vec![(Side::A, fa, [0, 1]), (Side::B, fb, [0, 1])],
        ..PairOutput::default()
    };

    let edges: Vec<([usize; 2], Point3<f64>, Point3<f64>)> = (0..3)
        .map(|i| (ids_a[i], ids_a[(i + 1) % 3], ta[i], ta[(i + 1) % 3]))
        .chain((0..3).map(|i| (ids_b[i], ids_b[(i + 1) % 3], tb[i], tb[(i + 1) % 3])))
        .map(|(u, v, pu, pv)| (edge_key(u, v), pu, pv))
        .collect();

    for (local, end) in [lo, hi].iter().enumerate() {
        for &(edge, pu, pv) in &edges {
            let on_edge = match end.key {
                PointKey::Vertex(id) if edge.contains(&id) => false,
                PointKey::EdgeFace { edge: own, .. } if own == edge => true,
                _ => {
                    let (t, distance) = project_on_segment(&end.position, &pu, &pv);
                    distance <= tol && t > 0.0 && t < 1.0
                }
            };
            if on_edge {
                output.on_edge.push((local, edge));
            }
        }
    }

    Some(output)
}

#[allow(clippy::too_many_arguments)]
fn coplanar_pair(
    fa: usize,
    fb: usize,
    ids_a: &[usize; 3],
    ids_b: &[usize; 3],
    ta: &[Point3<f64>; 3],
    tb: &[Point3<f64>; 3],
    plane_a: &Plane,
    tol: f64,
) -> Option<PairOutput> {
    let u = (ta[1] - ta[0]).normalize();
    let v = plane_a.normal.cross(&u);
    let project = |p: &Point3<f64>| {
        let d = p - ta[0];
        Point2::new(d.dot(&u), d.dot(&v))
    };
    let a2 = ta.map(|p| project(&p));
    let b2 = tb.map(|p| project(&p));
    if orient2d(&b2[0], &b2[1], &b2[2]).abs() <= f64::EPSILON {
        return None;
    }

    let mut output = PairOutput {
        coplanar: Some((fa, fb)),
        ..PairOutput::default()
    };
    let local_a = [0, 1, 2].map(|i| output.push(PointKey::Vertex(ids_a[i]), ta[i]));
    let local_b = [0, 1, 2].map(|i| output.push(PointKey::Vertex(ids_b[i]), tb[i]));

    // points along each edge as (parameter, local point)
    let mut along_a: [Vec<(f64, usize)>; 3] = Default::default();
    let mut along_b: [Vec<(f64, usize)>; 3] = Default::default();
    for i in 0..3 {
        along_a[i].extend([(0.0, local_a[i]), (1.0, local_a[(i + 1) % 3])]);
        along_b[i].extend([(0.0, local_b[i]), (1.0, local_b[(i + 1) % 3])]);
    }
    let edge_a = |i: usize| edge_key(ids_a[i], ids_a[(i + 1) % 3]);
    let edge_b = |j: usize| edge_key(ids_b[j], ids_b[(j + 1) % 3]);

    for i in 0..3 {
        for j in 0..3 {
            let crossing = segment_crossing_2d(
                &a2[i],
                &a2[(i + 1) % 3],
                &b2[j],
                &b2[(j + 1) % 3],
                1e-12,
            );
            if let Some((s, t)) = crossing {
                let position = ta[i] + (ta[(i + 1) % 3] - ta[i]) * s;
                let local = output.push(
                    PointKey::EdgeEdge {
                        a: edge_a(i),
                        b: edge_b(j),
                    },
                    position,
                );
                along_a[i].push((s, local));
                along_b[j].push((t, local));
                output.on_edge.push((local, edge_a(i)));
                output.on_edge.push((local, edge_b(j)));
            }
        }
    }

    // vertices of one triangle inside the other
    for j in 0..3 {
        if ids_a.contains(&ids_b[j]) || !point_in_triangle_2d(&b2[j], &a2, tol) {
            continue;
        }
        let mut on_boundary = false;
        for i in 0..3 {
            let (t, distance) = project_on_segment(&tb[j], &ta[i], &ta[(i + 1) % 3]);
            if distance <= tol && t > 0.0 && t < 1.0 {
                along_a[i].push((t, local_b[j]));
                output.on_edge.push((local_b[j], edge_a(i)));
                on_boundary = true;
            }
        }
        if !on_boundary {
            output.interior.push((Side::A, fa, local_b[j]));
        }
    }
    for i in 0..3 {
        if ids_b.contains(&ids_a[i]) || !point_in_triangle_2d(&a2[i], &b2, tol) {
            continue;
        }
        let mut on_boundary = false;
        for j in 0..3 {
            let (t, distance) = project_on_segment(&ta[i], &tb[j], &tb[(j + 1) % 3]);
            if distance <= tol && t > 0.0 && t < 1.0 {
                along_b[j].push((t, local_a[i]));
                output.on_edge.push((local_a[i], edge_b(j)));
                on_boundary = true;
            }
        }
        if !on_boundary {
            output.interior.push((Side::B, fb, local_a[i]));
        }
    }

    // edges of each triangle clipped to the other become constraints
    let positions: Vec<Point3<f64>> = output.points.iter().map(|p| p.position).collect();
    let mut clip = |along: &mut [Vec<(f64, usize)>; 3], target: &[Point2<f64>; 3], side: Side, face: usize| {
        for chain in along.iter_mut() {
            chain.sort_by(|x, y| x.0.total_cmp(&y.0));
            for pair in chain.windows(2) {
                let (p, q) = (&positions[pair[0].1], &positions[pair[1].1]);
                if (q - p).norm() <= tol {
                    continue;
                }
                let mid = project(&nalgebra::center(p, q));
                if point_in_triangle_2d(&mid, target, tol) {
                    output.segments.push((side, face, [pair[0].1, pair[1].1]));
                }
            }
        }
    };
    clip(&mut along_b, &a2, Side::A, fa);
    clip(&mut along_a, &b2, Side::B, fb);

    Some(output)
}

fn edge_set(triangles: &[[usize; 3]]) -> AHashSet<[usize; 2]> {
    triangles
        .iter()
        .flat_map(|t| (0..3).map(move |k| edge_key(t[k], t[(k + 1) % 3])))
        .collect()
}

/// Group triangles into patches connected across non-barrier edges.
fn flood_regions(triangles: &[[usize; 3]], barrier: &AHashSet<[usize; 2]>) -> Vec<Vec<usize>> {
    let mut by_edge: AHashMap<[usize; 2], Vec<usize>> = AHashMap::new();
    for (index, t) in triangles.iter().enumerate() {
        for k in 0..3 {
            by_edge.entry(edge_key(t[k], t[(k + 1) % 3])).or_default().push(index);
        }
    }

    let mut region_of = vec![usize::MAX; triangles.len()];
    let mut regions = Vec::new();
    for seed in 0..triangles.len() {
        if region_of[seed] != usize::MAX {
            continue;
        }
        let id = regions.len();
        region_of[seed] = id;
        let mut members = Vec::new();
        let mut stack = vec![seed];
        while let Some(current) = stack.pop() {
            members.push(current);
            let t = triangles[current];
            for k in 0..3 {
                let edge = edge_key(t[k], t[(k + 1) % 3]);
                if barrier.contains(&edge) {
                    continue;
                }
                for &neighbor in by_edge.get(&edge).into_iter().flatten() {
                    if region_of[neighbor] == usize::MAX {
                        region_of[neighbor] = id;
                        stack.push(neighbor);
                    }
                }
            }
        }
        regions.push(members);
    }
    regions
}

/// Retriangulated faces of one side with what is needed to classify them
struct Patches<'a> {
    triangles: &'a [[usize; 3]],
    /// Input face of every triangle
    origin: &'a [usize],
    /// Input faces of the other side cut as coplanar with each input face
    partners: &'a AHashMap<usize, Vec<usize>>,
}

impl Patches<'_> {
    /// Classify a region by the centroid of its largest triangle.
    ///
    /// A region is on the other surface only when its face was cut as
    /// coplanar with a face of the other side covering the centroid, so the
    /// cutting and classification bands are the same.
    fn classify(&self, region: &[usize], points: &[Point3<f64>], other: &Mesh, tol: f64) -> FaceLocation {
        let corners = |t: usize| self.triangles[t].map(|i| points[i]);
        let normal_of = |t: usize| {
            let [p, q, r] = corners(t);
            (q - p).cross(&(r - p))
        };

        let Some(&largest) = region
            .iter()
            .max_by(|&&x, &&y| normal_of(x).norm().total_cmp(&normal_of(y).norm()))
        else {
            return FaceLocation::Outside;
        };
        let [p, q, r] = corners(largest);
        let centroid = Point3::from((p.coords + q.coords + r.coords) / 3.0);

        let covering = self
            .partners
            .get(&self.origin[largest])
            .into_iter()
            .flatten()
            .copied()
            .find(|&face| projects_into_triangle(&centroid, &other.positions(&other.triangles[face]), tol));
        if let Some(face) = covering {
            return if normal_of(largest).dot(&other.face_normal(face)) > 0.0 {
                FaceLocation::OnSame
            } else {
                FaceLocation::OnOpposite
            };
        }

        if winding_number(&centroid, other).abs() > 0.5 {
            FaceLocation::Inside
        } else {
            FaceLocation::Outside
        }
    }
}
