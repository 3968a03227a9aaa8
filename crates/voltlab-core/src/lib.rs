//! Core circuit representation and MNA matrix structures for Voltlab.
//!
//! This crate provides the element contract, the node registry that
//! resolves pin connectivity into dense circuit nodes, and the
//! augmented Modified Nodal Analysis (MNA) system with its stamp
//! primitives. The simulation driver lives in `voltlab-engine`; the
//! element library in `voltlab-elements`.

pub mod element;
pub mod error;
pub mod mna;
pub mod node;
pub mod registry;
pub mod units;

pub use element::{Element, Iteration, SimContext};
pub use error::{Error, Result};
pub use mna::MnaSystem;
pub use node::NodeId;
pub use registry::NodeMap;
