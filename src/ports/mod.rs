// Stage interfaces. Each stage of the pipeline sits behind one trait so that
// the wire handling in `application` never depends on a concrete analyzer.

use std::io;
use std::path::Path;

use anyhow::Result;

use crate::domain::graph::Output;
use crate::domain::unit::{Resolution, SourceUnit};

/// Walks a project tree and groups matching files into source units.
pub trait Scanner {
    fn scan(&self, root: &Path) -> Result<Vec<SourceUnit>>;
}

/// Extracts definitions from the files of the given units.
pub trait Grapher {
    fn graph(&self, units: &[SourceUnit]) -> Result<Output>;
}

/// Maps a unit's raw dependency keys to the units they refer to.
pub trait DepResolver {
    fn resolve(&self, unit: &SourceUnit) -> Result<Vec<Resolution>>;
}

/// A stage's input stream. It is read to completion once and then closed;
/// a failing close is an error like a failing read.
pub trait StageInput {
    fn read_all(&mut self) -> io::Result<Vec<u8>>;
    fn close(&mut self) -> io::Result<()>;
}
