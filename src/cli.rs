//! Command-line definitions live in the `stockscope-cli` crate so the build
//! script and the docs generator can share them.

pub use stockscope_cli::*;
