/// Toolchain preflight for the graph stage.
///
/// The graph stage refuses to start unless the build toolchain supports the
/// optimization-level codegen flag. The probe runs the toolchain's help
/// command and looks for the flag in its output.

use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

pub const DEFAULT_TOOLCHAIN: &str = "rustc";
pub const REQUIRED_FLAG: &str = "opt-level";

/// The command a preflight runs and the flag its output must mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainProbe {
    pub program: String,
    pub args: Vec<String>,
    pub required_flag: String,
}

impl ToolchainProbe {
    /// Probe for `program`, asking for its codegen option listing.
    pub fn for_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-C".to_string(), "help".to_string()],
            required_flag: REQUIRED_FLAG.to_string(),
        }
    }
}

impl Default for ToolchainProbe {
    fn default() -> Self {
        Self::for_program(DEFAULT_TOOLCHAIN)
    }
}

/// Fails unless the probe command runs successfully and lists the flag.
pub fn check_toolchain(probe: &ToolchainProbe) -> Result<()> {
    debug!(program = %probe.program, args = ?probe.args, "probing toolchain");

    let output = Command::new(&probe.program)
        .args(&probe.args)
        .output()
        .with_context(|| format!("{} not found in PATH", probe.program))?;

    if !output.status.success() {
        bail!(
            "{} found but returned error: {:?}",
            probe.program,
            output.status.code()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.contains(&probe.required_flag) && !stderr.contains(&probe.required_flag) {
        bail!(
            "'{} {}' does not offer the '{}' flag. Please upgrade the toolchain.",
            probe.program,
            probe.args.join(" "),
            probe.required_flag
        );
    }

    info!(program = %probe.program, flag = %probe.required_flag, "toolchain preflight passed");
    Ok(())
}
