// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Invocation budget for one polygon evaluation

use crate::error::{Result, VisibilityError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Caps provider invocations by count and by wall-clock time.
///
/// Shared by every branch of an evaluation; charging is lock-free.
#[derive(Debug)]
pub struct InvocationBudget {
    used: AtomicUsize,
    max_invocations: Option<usize>,
    max_duration: Option<Duration>,
    deadline: Option<Instant>,
}

impl Default for InvocationBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl InvocationBudget {
    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    /// The deadline is measured from now.
    pub fn new(max_invocations: Option<usize>, max_duration: Option<Duration>) -> Self {
        Self {
            used: AtomicUsize::new(0),
            max_invocations,
            max_duration,
            deadline: max_duration.map(|d| Instant::now() + d),
        }
    }

    /// Same limits, nothing used, deadline measured from now.
    pub fn renewed(&self) -> Self {
        Self::new(self.max_invocations, self.max_duration)
    }

    /// Take one invocation from the budget.
    pub fn charge(&self, what: &str) -> Result<()> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(VisibilityError::BudgetExhausted(format!(
                    "time limit reached before {what}"
                )));
            }
        }

        let taken = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| match self.max_invocations {
                Some(max) if used >= max => None,
                _ => Some(used + 1),
            });
        taken.map(|_| ()).map_err(|used| {
            VisibilityError::BudgetExhausted(format!(
                "all {used} renderer invocations used before {what}"
            ))
        })
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> Option<usize> {
        self.max_invocations.map(|max| max.saturating_sub(self.used()))
    }
}
