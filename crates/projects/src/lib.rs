//! Projects domain module.
//!
//! Construction/renovation projects that consume store materials: planned
//! materials, usage bookings and the budget summary built from them.

pub mod project;
pub mod summary;

pub use project::{
    MaterialId, MaterialInput, MaterialUsage, MaterialUsageId, NewProject, Project, ProjectId,
    ProjectMaterial, ProjectStatus, ProjectUpdate,
};
pub use summary::{MaterialSummary, ProjectSummary, percent};
