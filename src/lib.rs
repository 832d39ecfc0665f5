//! # Routesim - Small-world overlay routing simulator
//!
//! Builds ring-structured overlay topologies, routes requests across
//! them with greedy and backtracking policies, and rewires the network
//! through path folding the way an adaptive overlay would.
//!
//! ## Overview
//!
//! Nodes live on a circle of locations in `[0.0, 1.0)` and route by
//! circular distance. A simulation run generates or loads a topology,
//! routes a batch of requests over it, and reports success rates, path
//! length distributions, and graph-level statistics. Every run is
//! deterministic for a given seed.
//!
//! ## Architecture
//!
//! - `graph`: the topology arena, degree and link-length sources,
//!   recency queues, and path folding
//! - `routing`: request routing with lookahead peer selection
//! - `policy`: routing and folding policy enums shared across modules
//! - `formats`: binary, DOT, and GML persistence
//! - `probe`: random-walk reachability experiments
//! - `stats`: experiment tallies and report rendering
//!
//! ## Error Handling
//!
//! Fallible public functions return `color_eyre` results; format
//! parsing reports typed [`formats::FormatError`] values that callers
//! can match on. Violated simulation invariants panic.

pub mod formats;
pub mod graph;
pub mod policy;
pub mod probe;
pub mod routing;
pub mod stats;
