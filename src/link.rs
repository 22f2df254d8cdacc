//! Native build: assembly plus the C runtime into an executable
//!
//! The build runs in a private temporary directory which is removed when
//! [`TempBuildDir`] is dropped, on success and on every error path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info};

use crate::codegen::OptLevel;

/// The C runtime linked into every executable
pub const RUNTIME_SOURCE: &str = include_str!("../runtime/bbruntime.c");

pub const ASSEMBLY_FILENAME: &str = "bbprogram.s";
pub const RUNTIME_FILENAME: &str = "bbruntime.c";
pub const EXECUTABLE_FILENAME: &str = "bbprogram";

/// C compilers tried in order when none is configured
const COMPILERS: &[&str] = &["cc", "gcc", "clang"];

/// Build errors
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No C compiler found (tried {})", COMPILERS.join(", "))]
    NoCompiler,

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed with {status}:\n{stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Native build settings
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    pub opt_level: OptLevel,
    /// Build the runtime with `-O0 -g` instead of optimizing it
    pub debug: bool,
    /// C compiler to use instead of searching `PATH`
    pub compiler: Option<PathBuf>,
}

impl BuildConfig {
    fn compiler_flags(&self) -> &'static [&'static str] {
        if self.debug {
            &["-O0", "-g"]
        } else {
            &["-O2"]
        }
    }

    fn find_compiler(&self) -> BuildResult<PathBuf> {
        if let Some(compiler) = &self.compiler {
            return Ok(compiler.clone());
        }
        COMPILERS
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or(BuildError::NoCompiler)
    }
}

/// A directory under the system temp dir, deleted on drop
#[derive(Debug)]
pub struct TempBuildDir {
    path: PathBuf,
}

impl TempBuildDir {
    pub fn new() -> BuildResult<Self> {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "blitzc-{}-{nanos}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempBuildDir {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            debug!(path = %self.path.display(), %err, "could not remove build directory");
        }
    }
}

/// Compile `assembly` and the runtime into an executable at `output`.
pub fn build_executable(assembly: &str, output: &Path, config: &BuildConfig) -> BuildResult<()> {
    let dir = TempBuildDir::new()?;
    let asm_path = dir.path().join(ASSEMBLY_FILENAME);
    let runtime_path = dir.path().join(RUNTIME_FILENAME);
    let exe_path = dir.path().join(EXECUTABLE_FILENAME);
    fs::write(&asm_path, assembly)?;
    fs::write(&runtime_path, RUNTIME_SOURCE)?;

    let compiler = config.find_compiler()?;
    let mut command = Command::new(&compiler);
    command
        .args(config.compiler_flags())
        .arg(&asm_path)
        .arg(&runtime_path)
        .arg("-o")
        .arg(&exe_path)
        .arg("-lm");
    info!(compiler = %compiler.display(), debug = config.debug, "building executable");
    run_checked(&mut command, &compiler.display().to_string())?;

    fs::copy(&exe_path, output)?;
    debug!(output = %output.display(), "copied executable");
    Ok(())
}

/// Run an executable and capture its output
pub fn run_executable(path: &Path) -> BuildResult<Output> {
    let mut command = Command::new(path);
    run_checked(&mut command, &path.display().to_string())
}

fn run_checked(command: &mut Command, tool: &str) -> BuildResult<Output> {
    let output = command.output().map_err(|source| BuildError::Spawn {
        tool: tool.to_string(),
        source,
    })?;
    if !output.status.success() {
        return Err(BuildError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(output)
}
