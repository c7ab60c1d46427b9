//! The four pipeline steps `cli.rs` dispatches to: `prep` builds the
//! MMseqs2/HMMER databases, `seed` finds rough alignment seeds, `align`
//! runs the bounded cloud-search core over those seeds, and `search`
//! chains all three for the single-command entry point.

pub mod align;
pub mod multithread;
pub mod prep;
pub mod seed;

pub use align::align;
pub use multithread::align_threaded_c;
pub use prep::prep;
pub use seed::seed;

use crate::extension_traits::PathBufExt;
use crate::Args;

use anyhow::Result;

/// Run `prep`, `seed`, then the threaded `align` path back to back,
/// for the `mmoreseqs search` subcommand. Checks the results path is
/// writable up front, before spending time on the MMseqs2/HMMER steps.
pub fn search(args: &Args) -> Result<()> {
    args.paths.results.open(true)?;

    prep(args)?;
    let (profiles, seed_map) = seed(args)?;
    align_threaded_c(args, profiles, seed_map)
}
