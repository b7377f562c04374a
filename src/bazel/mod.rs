//! Bazel facade: binary validation, workspace sessions and the build
//! metadata cache.

mod aspect;
mod command;
mod complete;
mod error;
mod instance;
mod runner;
mod version;

pub use aspect::*;
pub use command::BazelCommand;
pub use complete::*;
pub use error::{BazelError, BazelNotFoundError, ErrorKind};
pub use instance::{select_build_info_artifact, BazelInstance, ARTIFACT_MARKER};
pub use version::*;
