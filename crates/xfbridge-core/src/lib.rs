//! xfbridge Core Library
//!
//! Error handling, diagnostics and the unit/space converter shared by the
//! chunk graph and the conversion engine.

pub mod diagnostics;
pub mod error;
pub mod units;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, UnitKind};
pub use error::{Error, Result, ResultExt};

/// Re-export commonly used items
pub mod prelude {
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, UnitKind};
    pub use crate::error::{Error, Result, ResultExt};
}
