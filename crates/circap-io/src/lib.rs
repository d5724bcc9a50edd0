//! # circap-io: input sheets and result sheets
//!
//! - [`loader`]: a directory of CSV parameter sheets into
//!   [`ExtensionData`](circap_core::ExtensionData)
//! - [`sheets`]: atomic CSV result sheets and the `carry_over.json` snapshot
//! - [`handoff`]: bounded polling for sheets produced by another window
//!
//! ## Error Handling
//!
//! Loading returns [`LoadError`]; waiting returns [`HandoffError`]. Both
//! convert into [`circap_core::CircapError`]. Sheet writing and reading use
//! `anyhow::Result` with file-path context.

pub mod error;
pub mod handoff;
pub mod loader;
pub mod sheets;

pub use error::{HandoffError, LoadError};
pub use handoff::{missing_sheets, wait_for_sheets, PollConfig};
pub use loader::{load_extension_dir, LoadResult};
pub use sheets::{read_carry_over, read_sheets, write_carry_over, write_sheets};
