/// Man page grapher.
///
/// Emits one exported `command` def per man page. The command name is the
/// file's base name up to its first `.`; `ls.1p.txt` defines `ls`.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::graph::{Def, DefData, DefKey, Output};
use crate::domain::unit::SourceUnit;
use crate::ports::Grapher;

pub const COMMAND_KIND: &str = "command";

pub struct ManPageGrapher {
    /// Directory that unit file paths are relative to.
    pub root: PathBuf,
}

impl ManPageGrapher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn graph_page(&self, unit: &SourceUnit, page: &str, output: &mut Output) -> Result<()> {
        // Only the file's existence matters; its content is not parsed.
        File::open(self.root.join(page))
            .with_context(|| format!("Failed to open file {}", page))?;

        let name = command_name(page);
        let def = make_command_def(unit, page, name, name.len())
            .with_context(|| format!("failed to create command def for {}", page))?;
        debug!(file = page, command = name, "graphed man page");
        output.defs.push(def);
        Ok(())
    }
}

impl Grapher for ManPageGrapher {
    fn graph(&self, units: &[SourceUnit]) -> Result<Output> {
        let mut output = Output::default();
        for unit in units {
            for page in &unit.info.files {
                self.graph_page(unit, page, &mut output)?;
            }
        }
        Ok(output)
    }
}

/// Base name of `page` up to its first `.`, or the whole base name if it has none.
pub fn command_name(page: &str) -> &str {
    let file = Path::new(page)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(page);
    file.split('.').next().unwrap_or(file)
}

/// Builds a command def whose name span ends at `offset`.
///
/// Man pages are not lexed, so callers pass `command.len()` and the span is
/// the synthetic `[0, len)`.
fn make_command_def(unit: &SourceUnit, file: &str, command: &str, offset: usize) -> Result<Def> {
    let data = serde_json::to_value(DefData {
        name: command.to_string(),
        keyword: COMMAND_KIND.to_string(),
        kind: COMMAND_KIND.to_string(),
        ..DefData::default()
    })?;
    let def_end = u32::try_from(offset).context("def offset does not fit in 32 bits")?;
    let def_start = u32::try_from(offset - command.len())
        .context("def offset does not fit in 32 bits")?;

    Ok(Def {
        key: DefKey {
            unit_type: unit.key.unit_type.clone(),
            unit: unit.key.name.clone(),
            path: format!("{}/{}", file, command),
            ..DefKey::default()
        },
        name: command.to_string(),
        kind: COMMAND_KIND.to_string(),
        file: file.to_string(),
        def_start,
        def_end,
        exported: true,
        data: Some(data),
    })
}
