//! Read-only collaborators the bounded core consumes (spec.md §3, §6):
//! the digitised query/target [`Sequence`], the [`Profile`] built from an
//! HMMER3/f ASCII profile, the [`Trace`] the MEA traceback produces, and
//! the [`Alignment`] result record the reporting layer writes out.

pub mod alignment;
pub mod hmm;
pub mod sequence;
pub mod trace;

pub use alignment::Alignment;
pub use hmm::Profile;
pub use sequence::Sequence;
pub use trace::Trace;
