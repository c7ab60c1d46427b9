//! Result serialization. Kept separate from [`crate::structs::alignment`]
//! so the scoring/aggregation types stay writer-agnostic; `nale` itself
//! only writes to anything implementing `std::io::Write`, leaving file
//! handling to the caller.

pub mod output_tabular;

pub use output_tabular::write_tabular_output;
