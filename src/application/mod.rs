// Stage use cases: the JSON boundary around each port.
//
// Every stage reads its whole input, closes it, computes, then writes its
// whole output. Nothing is written when an earlier step fails.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::domain::unit::SourceUnit;
use crate::ports::{DepResolver, Grapher, Scanner, StageInput};

pub struct ScanUsecase<'a> {
    pub scanner: &'a dyn Scanner,
}

impl<'a> ScanUsecase<'a> {
    /// Scans `root` and writes the units as pretty-printed JSON.
    pub fn run(&self, root: &Path, out: &mut dyn Write) -> Result<()> {
        let units = self
            .scanner
            .scan(root)
            .with_context(|| format!("scanning the path {} failed", root.display()))?;
        info!(units = units.len(), "scan complete");

        let bytes =
            serde_json::to_vec_pretty(&units).context("marshalling source units failed")?;
        out.write_all(&bytes).context("writing output failed")?;
        out.flush().context("writing output failed")?;
        Ok(())
    }
}

pub struct GraphUsecase<'a> {
    pub grapher: &'a dyn Grapher,
}

impl<'a> GraphUsecase<'a> {
    /// Reads units from `input` and writes the graph `Output` as one JSON line.
    pub fn run(&self, input: &mut dyn StageInput, out: &mut dyn Write) -> Result<()> {
        let bytes = input.read_all().context("Failed to read STDIN")?;
        let units = parse_source_units(&bytes)?;
        input.close().context("Failed to close STDIN")?;

        if units.is_empty() {
            bail!("Input contains no source unit data.");
        }
        debug!(units = units.len(), "graphing source units");

        let output = self
            .grapher
            .graph(&units)
            .context("Failed to graph source units")?;
        info!(defs = output.defs.len(), "graph complete");

        let mut bytes = serde_json::to_vec(&output).context("Failed to output graph data")?;
        bytes.push(b'\n');
        out.write_all(&bytes).context("Failed to output graph data")?;
        out.flush().context("Failed to output graph data")?;
        Ok(())
    }
}

/// Parses a JSON array of units, falling back to a single bare unit.
pub fn parse_source_units(bytes: &[u8]) -> Result<Vec<SourceUnit>> {
    match first_json_value::<Vec<SourceUnit>>(bytes) {
        Ok(units) => Ok(units),
        Err(seq_err) => {
            debug!(error = %seq_err, "input is not a unit array, trying a single unit");
            let unit: SourceUnit = first_json_value(bytes)
                .context("Failed to parse source units from input")?;
            Ok(vec![unit])
        }
    }
}

/// Decodes the first JSON value in `bytes`. Anything after it is ignored.
fn first_json_value<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    match serde_json::Deserializer::from_slice(bytes).into_iter::<T>().next() {
        Some(value) => value,
        // Empty or whitespace-only input: let the plain parser report EOF.
        None => serde_json::from_slice(bytes),
    }
}

pub struct DepResolveUsecase<'a> {
    pub resolver: &'a dyn DepResolver,
}

impl<'a> DepResolveUsecase<'a> {
    /// Reads exactly one unit and writes its resolutions as pretty-printed
    /// JSON followed by a newline.
    pub fn run(&self, input: &mut dyn StageInput, out: &mut dyn Write) -> Result<()> {
        let bytes = input
            .read_all()
            .context("reading the source unit from STDIN failed")?;
        let unit: SourceUnit =
            first_json_value(&bytes).context("parsing the source unit from STDIN failed")?;
        input.close().context("closing STDIN failed")?;

        let resolutions = self
            .resolver
            .resolve(&unit)
            .with_context(|| format!("resolving dependencies of {} failed", unit.key.name))?;

        let mut bytes = serde_json::to_vec_pretty(&resolutions)
            .context("marshalling resolved units failed")?;
        bytes.push(b'\n');
        out.write_all(&bytes).context("writing output failed")?;
        out.flush().context("writing output failed")?;
        Ok(())
    }
}
