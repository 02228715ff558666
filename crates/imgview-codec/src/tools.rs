//! External tool detection and management.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Explicitly configured executable paths. Unset tools are looked up on `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: Option<PathBuf>,
    pub cjxl: Option<PathBuf>,
    pub djxl: Option<PathBuf>,
    pub avifdec: Option<PathBuf>,
    pub jpegtran: Option<PathBuf>,
}

impl ToolPaths {
    fn configured(&self, name: &str) -> Option<&Path> {
        match name {
            "ffmpeg" => self.ffmpeg.as_deref(),
            "cjxl" => self.cjxl.as_deref(),
            "djxl" => self.djxl.as_deref(),
            "avifdec" => self.avifdec.as_deref(),
            "jpegtran" => self.jpegtran.as_deref(),
            _ => None,
        }
    }

    /// Resolve the executable for `name`.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        get_tool_path(name, self.configured(name))
    }
}

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use imgview_codec::check_tool;
///
/// let info = check_tool("cjxl");
/// if info.available {
///     println!("cjxl version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_with_arg(name, "--version")
}

/// Check if a tool is available using a custom version argument.
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    let result = Command::new(name)
        .arg(version_arg)
        .stdin(Stdio::null())
        .output();

    match result {
        Ok(output) if output.status.success() => {
            // jpegtran prints its banner on stderr
            let banner = if output.stdout.is_empty() {
                &output.stderr
            } else {
                &output.stdout
            };
            let version = String::from_utf8_lossy(banner)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = which::which(name).ok();

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check all external tools the codec shells out to.
///
/// Returns information about ffmpeg, cjxl, djxl, avifdec, and jpegtran.
pub fn check_tools() -> Vec<ToolInfo> {
    vec![
        check_tool_with_arg("ffmpeg", "-version"),
        check_tool("cjxl"),
        check_tool("djxl"),
        check_tool("avifdec"),
        check_tool_with_arg("jpegtran", "-version"),
    ]
}

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            "Configured {} path {} does not exist, falling back to PATH",
            name,
            path.display()
        );
    }

    require_tool(name)
}

/// Run a tool to completion, returning its stdout.
pub(crate) fn run_tool<S: AsRef<OsStr>>(program: &Path, args: &[S]) -> Result<Vec<u8>> {
    let tool = program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::tool_failed(&tool, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed(
            &tool,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }

    tracing::debug!("{} produced {} bytes", tool, output.stdout.len());

    Ok(output.stdout)
}
