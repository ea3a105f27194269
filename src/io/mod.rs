// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - mesh files and run exports

mod export;
mod obj;

pub use export::{export_polygon_volume, export_segment_volumes, write_summary};
pub use obj::{parse_obj, read_obj, to_obj_string, write_obj, ObjParseError};
