// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Single-slot handle around a stateful provider or engine

use super::{VisibilityVolumeProvider, VisibilityVolumeRequest};
use crate::error::Result;
use crate::geometry::{BooleanEngine, Mesh};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::trace;

/// Serializes every call into the wrapped value.
///
/// Callers keep preparing requests concurrently; only the call into the
/// wrapped host is one-at-a-time.
#[derive(Debug, Default)]
pub struct Exclusive<T> {
    slot: Mutex<T>,
}

impl<T> Exclusive<T> {
    pub fn new(inner: T) -> Self {
        Self {
            slot: Mutex::new(inner),
        }
    }

    /// Run `f` with sole access to the wrapped value.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let requested = Instant::now();
        let mut guard = self.acquire();
        trace!(waited_us = requested.elapsed().as_micros() as u64, "acquired exclusive slot");
        f(&mut guard)
    }

    pub fn into_inner(self) -> T {
        self.slot.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    // poisoning is ignored
    fn acquire(&self) -> MutexGuard<'_, T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: VisibilityVolumeProvider> VisibilityVolumeProvider for Exclusive<T> {
    fn compute(&self, request: &VisibilityVolumeRequest) -> Result<Mesh> {
        self.with(|provider| provider.compute(request))
    }
}

impl<T: BooleanEngine> BooleanEngine for Exclusive<T> {
    fn intersect(&self, a: &Mesh, b: &Mesh) -> Result<Mesh> {
        self.with(|engine| engine.intersect(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use crate::visibility::{FnProvider, VolumeParameters};
    use nalgebra::Point3;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_calls_never_overlap() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let provider = Exclusive::new(FnProvider::new(|request: &VisibilityVolumeRequest| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(Primitive::cube(request.viewpoint, 1.0).to_mesh())
        }));

        let params = VolumeParameters::default();
        let results: Vec<_> = (0..16)
            .into_par_iter()
            .map(|i| provider.compute(&params.request_for(Point3::new(i as f64, 0.0, 0.0), format!("v{i}"))))
            .collect();

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_inner_returns_value() {
        let slot = Exclusive::new(41);
        slot.with(|value| *value += 1);
        assert_eq!(slot.into_inner(), 42);
    }
}
