//! Error types for voltlab-core.
//!
//! All variants are topology errors: the circuit cannot be simulated
//! until the user edits it, so none of them is retried internally.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("circuit has no elements")]
    EmptyCircuit,

    #[error("element {element} declares no posts")]
    NoPosts { element: usize },

    #[error("circuit has no ground reference")]
    NoGround,

    #[error("node {node} has no conductive path to ground")]
    NoGroundPath { node: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
