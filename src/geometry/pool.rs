// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tolerance-snapped point pool backed by a spatial hash

use ahash::AHashMap;
use nalgebra::Point3;

type CellKey = (i64, i64, i64);

/// Deduplicating point store: any point closer than `tolerance` to an
/// already stored point resolves to that point's index.
#[derive(Debug, Clone)]
pub struct PointPool {
    points: Vec<Point3<f64>>,
    cells: AHashMap<CellKey, Vec<usize>>,
    tolerance: f64,
}

impl PointPool {
    pub fn new(tolerance: f64) -> Self {
        Self {
            points: Vec::new(),
            cells: AHashMap::new(),
            tolerance: tolerance.max(f64::MIN_POSITIVE),
        }
    }

    pub fn with_capacity(tolerance: f64, capacity: usize) -> Self {
        let mut pool = Self::new(tolerance);
        pool.points.reserve(capacity);
        pool.cells.reserve(capacity);
        pool
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn cell_of(&self, p: &Point3<f64>) -> CellKey {
        (
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
            (p.z / self.tolerance).floor() as i64,
        )
    }

    /// Index of the closest stored point within tolerance, if any.
    pub fn find(&self, p: &Point3<f64>) -> Option<usize> {
        let (cx, cy, cz) = self.cell_of(p);
        let tol_sq = self.tolerance * self.tolerance;
        let mut best: Option<(usize, f64)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &idx in bucket {
                        let d = (self.points[idx] - p).norm_squared();
                        if d <= tol_sq && best.map_or(true, |(_, bd)| d < bd) {
                            best = Some((idx, d));
                        }
                    }
                }
            }
        }

        best.map(|(idx, _)| idx)
    }

    /// Insert a point, returning the index of the snapped point.
    pub fn insert(&mut self, p: Point3<f64>) -> usize {
        if let Some(existing) = self.find(&p) {
            return existing;
        }
        let idx = self.points.len();
        let key = self.cell_of(&p);
        self.points.push(p);
        self.cells.entry(key).or_default().push(idx);
        idx
    }

    pub fn get(&self, idx: usize) -> Point3<f64> {
        self.points[idx]
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snaps_nearby_points() {
        let mut pool = PointPool::new(1e-6);
        let a = pool.insert(Point3::new(1.0, 2.0, 3.0));
        let b = pool.insert(Point3::new(1.0 + 4e-7, 2.0, 3.0 - 3e-7));
        let c = pool.insert(Point3::new(1.0 + 1e-3, 2.0, 3.0));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_snaps_across_cell_boundaries() {
        let mut pool = PointPool::new(0.1);
        let a = pool.insert(Point3::new(0.0999, 0.0, 0.0));
        let b = pool.insert(Point3::new(0.1001, 0.0, 0.0));
        assert_eq!(a, b);
    }
}
