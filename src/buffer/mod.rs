//! Trajectory storage and advantage estimation
//!
//! A [`trajectory::Trajectory`] collects the transitions of one rollout;
//! [`gae`] turns its rewards, value estimates and done flags into advantages
//! and return targets.

pub mod gae;
pub mod trajectory;

pub use gae::{compute_gae, normalize_advantages};
pub use trajectory::Trajectory;
