//! Data models for the edit pipeline.
//!
//! This module contains the core data structures used throughout the crate:
//! - Enums for action classes, transitions, and narrative roles
//! - Clip identity and media metadata
//! - Normalized analysis results and precision cuts
//! - The frozen edit plan

mod analysis;
mod clip;
mod cuts;
mod enums;
mod plan;

// Re-export all public types
pub use analysis::{ActionHint, AnalysisResult, AnalysisWarning, TimeWindow};
pub use clip::{clip_id_for, Clip};
pub use cuts::{CutEntry, PrecisionCut};
pub use enums::{ActionClass, ClipRole, TransitionKind};
pub use plan::{EditPlan, ExcludedClip, Segment, PLAN_VERSION};
