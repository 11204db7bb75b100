//! TOML settings with environment overrides. `Settings::in_memory` is the
//! self-contained profile used by tests and the demo binary.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
