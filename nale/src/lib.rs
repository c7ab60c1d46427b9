//! Accelerated profile-HMM / sequence homology search core: antidiagonal
//! cloud search, edgebound algebra, a sparse three-state DP matrix,
//! bounded Forward/Backward, posterior decoding, and null2 bias
//! correction.
//!
//! Every mutable structure here is owned by a single `(query, target)`
//! work context: nothing in this crate touches a thread, a socket, or
//! process-wide mutable state besides the lazily initialised log-sum
//! table in [`numeric`].

pub mod align;
pub mod error;
pub mod numeric;
pub mod output;
pub mod structs;
