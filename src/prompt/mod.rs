pub mod builder;

pub use builder::{build_planner_messages, build_verifier_messages};
