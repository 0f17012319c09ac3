//! xfbridge - editable scene <-> XFBIN clump conversion
//!
//! Facade over the workspace crates:
//! - [`common`]: errors, diagnostics, unit conversion
//! - [`nucc`]: the container chunk graph and its codecs
//! - [`convert`]: bones, weights, meshes, clump assembly, import/export
//!
//! ```rust,ignore
//! use xfbridge::prelude::*;
//!
//! xfbridge::nucc::logging::init_default();
//!
//! let importer = Importer::new(JsonCodec::pretty(), ImportSettings::default());
//! let (scene, _) = importer.import("1nrtbod1.json".as_ref())?;
//!
//! let exporter = Exporter::new(JsonCodec::pretty(), ExportSettings::default());
//! let report = exporter.export(&scene, "1nrtbod1.json".as_ref())?;
//! println!("{} clump(s), {} skipped unit(s)", report.clumps.len(), report.diagnostics.len());
//! ```

pub use xfbridge_convert as convert;
pub use xfbridge_core as common;
pub use xfbridge_nucc as nucc;

/// Items needed for a typical import/export round
pub mod prelude {
    pub use xfbridge_convert::{ExportReport, ExportSettings, Exporter, ImportReport, ImportSettings, Importer, Scene};
    pub use xfbridge_core::prelude::*;
    pub use xfbridge_nucc::{Container, ContainerCodec, JsonCodec};
}
