// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types shared by the visibility pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the provider, the boolean engine and the analyzers.
#[derive(Debug, Error)]
pub enum VisibilityError {
    /// The external renderer could not be launched or exited non-zero.
    #[error("renderer failed for volume '{token}' (status {status:?}): {output}")]
    RenderFailure {
        token: String,
        status: Option<i32>,
        output: String,
    },

    /// A mesh artifact was missing or could not be parsed.
    #[error("failed to read mesh {path}: {reason}")]
    MeshReadFailure { path: PathBuf, reason: String },

    #[error("boolean intersection failed: {0}")]
    BooleanFailure(#[from] BooleanFailure),

    /// Zero-length polygon edge, too few polygon vertices, or a mesh with
    /// fewer than 4 vertices.
    #[error("degenerate input: {0}")]
    DegenerateInputFailure(String),

    #[error("evaluation budget exhausted: {0}")]
    BudgetExhausted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why a solid intersection could not produce a valid closed mesh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BooleanFailure {
    #[error("input mesh {which} is invalid: {reason}")]
    InvalidInput { which: char, reason: String },

    #[error("the solids do not overlap")]
    Disjoint,

    #[error("result is not a closed manifold ({open_edges} open edges, {overfull_edges} edges with more than two faces)")]
    NonManifoldResult {
        open_edges: usize,
        overfull_edges: usize,
    },

    #[error("result faces disagree on orientation across {flipped_edges} edges")]
    Unoriented { flipped_edges: usize },

    #[error("result has {components} disconnected shells")]
    Disconnected { components: usize },

    #[error("triangulation failed: {0}")]
    Triangulation(String),
}

impl VisibilityError {
    /// Short machine-friendly name of the error kind, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RenderFailure { .. } => "RenderFailure",
            Self::MeshReadFailure { .. } => "MeshReadFailure",
            Self::BooleanFailure(_) => "BooleanFailure",
            Self::DegenerateInputFailure(_) => "DegenerateInputFailure",
            Self::BudgetExhausted(_) => "BudgetExhausted",
            Self::Io(_) => "Io",
        }
    }
}

pub type Result<T> = std::result::Result<T, VisibilityError>;
