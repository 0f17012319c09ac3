//! Container codec seam
//!
//! The byte-exact container layout lives outside this crate. Anything able
//! to turn bytes into a [`Container`] and back implements [`ContainerCodec`];
//! [`JsonCodec`] is the snapshot format used by tests and hosts that keep
//! the graph as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use xfbridge_core::{Error, Result, ResultExt};

use crate::container::Container;

/// Reads and writes whole containers
pub trait ContainerCodec: Send + Sync {
    /// Human-readable codec name
    fn name(&self) -> &str;

    /// File extensions this codec handles
    fn extensions(&self) -> &[&str];

    /// Decode a container
    fn read<R: Read>(&self, reader: R) -> Result<Container>;

    /// Encode a container
    fn write<W: Write>(&self, container: &Container, writer: W) -> Result<()>;

    /// Decode a container from a file
    fn read_file(&self, path: &Path) -> Result<Container> {
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        self.read(BufReader::new(file))
            .with_context(|| format!("reading {} container {}", self.name(), path.display()))
    }

    /// Encode a container to a file, replacing it
    fn write_file(&self, container: &Container, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write(container, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// JSON snapshot of the chunk graph
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    /// Indent the output
    pub pretty: bool,
}

impl JsonCodec {
    /// Create a compact JSON codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an indenting JSON codec
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ContainerCodec for JsonCodec {
    fn name(&self) -> &str {
        "JSON"
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn read<R: Read>(&self, reader: R) -> Result<Container> {
        let container: Container = serde_json::from_reader(reader)?;
        container.validate()?;
        tracing::debug!(chunks = container.len(), pages = container.pages().len(), "Read container snapshot");
        Ok(container)
    }

    fn write<W: Write>(&self, container: &Container, writer: W) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(writer, container)?;
        } else {
            serde_json::to_writer(writer, container)?;
        }
        Ok(())
    }
}
