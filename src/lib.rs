//! Bazel driver - run Bazel on behalf of an IDE.
//!
//! Builds, tests, target completion and IDE build metadata for Bazel
//! workspaces, on top of a small process runner that routes each output line
//! either to a console or to a caller-defined selection.

pub mod bazel;
pub mod build_info;
pub mod command;
pub mod config;
