// THEORY:
// This file is the main entry point for the `ripple_floor` library crate.
// It exposes the `TouchPipeline` (one rolling-background detector per camera
// stream) together with the frame source adapters that feed it and the
// runner that ticks it from a host frame loop.
//
// The detection stages themselves live in `core_modules` and are usable on
// their own: circular frame buffer, background accumulator, change detector
// and blob extractor. Everything above them (pipeline, sources, runner) is
// plumbing that decides *when* and *on what* those stages run.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod runner;
pub mod sources;

pub use config::DetectorConfig;
pub use error::DetectorError;
pub use pipeline::{Report, TouchPipeline, TouchPoint};
