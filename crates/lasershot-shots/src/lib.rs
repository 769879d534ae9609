//! Online grouping of marker detections into shots.
//!
//! Points arrive one at a time. Each point joins the first shot (in creation
//! order) whose running centroid is within the spatial threshold *and* whose
//! most recent point is within the temporal threshold; otherwise it starts a
//! new shot. Shots are never merged, split or deleted.

mod clusterer;
mod shot;

pub use clusterer::{assign, Assignment, ShotClusterer, ShotParams};
pub use shot::{Shot, ShotSession};
