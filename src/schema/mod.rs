//! RGS session log schema
//!
//! This module declares the fixed shape of a session log as an explicit tree
//! of field descriptors. The validator walks this tree; the CLI renders it.

mod descriptor;
mod session_log;

pub use descriptor::*;
pub use session_log::*;
