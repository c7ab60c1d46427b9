//! The bounded (sparse-shape) half of the core: cloud search builds the
//! shape, the rest of this module consumes it — Forward/Backward,
//! posterior decoding, null-model correction, and MEA traceback.

pub mod cloud_search;
pub mod domain;
pub mod fwdbck;
pub mod optimal_accuracy;
pub mod posterior;
pub mod structs;

pub use cloud_search::{cloud_search_backward, cloud_search_forward};
pub use domain::{best_domain_score, null1_score, null2_score};
pub use fwdbck::{
    backward_bounded, backward_bounded_in_range, forward_bounded, forward_bounded_in_range,
};
pub use optimal_accuracy::{optimal_accuracy_bounded, traceback_bounded};
pub use posterior::posterior_bounded;
