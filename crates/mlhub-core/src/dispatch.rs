//! Command Dispatcher
//!
//! Maps `ml <command> <model> [args]` to `<command>.<ext>` inside the
//! installed package and runs it with the interpreter its extension calls
//! for. Standard output goes straight to the terminal; standard error is
//! captured so a failing script can be classified into a typed error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use mlhub_schema::ModelName;
use regex::Regex;
use tokio::process::Command;

use crate::error::{HubError, Result};
use crate::package::load_installed;
use crate::paths::HubLayout;
use crate::prompt::Prompter;

/// Variable holding the directory `ml` was invoked from.
pub const ENV_CMD_CWD: &str = "_MLHUB_CMD_CWD";

/// Variable holding the name of the model being run.
pub const ENV_MODEL_NAME: &str = "_MLHUB_MODEL_NAME";

/// A resolved, ready-to-run command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Model the command belongs to.
    pub model: ModelName,
    /// Command name as typed.
    pub command: String,
    /// Interpreter binary, or `None` to execute the script itself.
    pub interpreter: Option<&'static str>,
    /// Absolute path of the script.
    pub script: PathBuf,
    /// Package directory; the child runs here.
    pub working_dir: PathBuf,
    /// Trailing arguments, passed verbatim.
    pub args: Vec<String>,
}

impl Invocation {
    /// Program and argument vector of the child process.
    pub fn argv(&self) -> (PathBuf, Vec<String>) {
        let script = self.script.to_string_lossy().into_owned();
        match self.interpreter {
            Some(interp) => {
                let mut args = vec![script];
                args.extend(self.args.iter().cloned());
                (PathBuf::from(interp), args)
            }
            None => (self.script.clone(), self.args.clone()),
        }
    }
}

/// Interpreter for a script file, chosen by extension.
pub fn interpreter_for(script: &Path) -> Option<&'static str> {
    match script.extension().and_then(std::ffi::OsStr::to_str) {
        Some("R" | "r") => Some("Rscript"),
        Some("py") => Some("python3"),
        _ => None,
    }
}

/// Whether a graphical display is reachable from this process.
pub fn display_available() -> bool {
    if cfg!(any(target_os = "macos", target_os = "windows")) {
        return true;
    }
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()))
}

/// Resolve `command` of `model` into an [`Invocation`] without running it.
///
/// When the command needs a display and `display_available` is false, the
/// user is asked whether to continue; the default is no.
///
/// # Errors
///
/// Returns [`HubError::NotInstalled`] for an unknown model,
/// [`HubError::CommandNotFound`] for an undeclared command or a missing
/// script, and [`HubError::DisplayDeclined`] when the user stops.
pub fn prepare(
    layout: &HubLayout,
    model: &str,
    command: &str,
    args: &[String],
    display_available: bool,
    prompter: &dyn Prompter,
) -> Result<Invocation> {
    let installed = load_installed(layout, model)?;
    let manifest = &installed.manifest;
    let not_found = || HubError::CommandNotFound {
        command: command.to_string(),
        model: ModelName::from(model),
    };

    if !manifest.has_command(command) {
        return Err(not_found());
    }

    if manifest.requires_display(command) && !display_available {
        let question = format!(
            "Graphic display is required but not available for command '{command}'. Continue"
        );
        if !prompter.confirm(&question, false)? {
            return Err(HubError::DisplayDeclined {
                command: command.to_string(),
                model: ModelName::from(model),
            });
        }
    }

    let script = installed.path.join(manifest.script_name(command));
    if !script.is_file() {
        tracing::debug!(script = %script.display(), "declared command has no script");
        return Err(not_found());
    }

    Ok(Invocation {
        model: ModelName::from(model),
        command: command.to_string(),
        interpreter: interpreter_for(&script),
        script,
        working_dir: installed.path,
        args: args.to_vec(),
    })
}

/// How a dispatched script ended, when it did not map onto a typed error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Zero exit. Captured stderr is handed back for forwarding.
    Success {
        /// Captured standard error.
        stderr: String,
    },
    /// Non-zero exit with no recognised failure signature.
    Failed {
        /// Exit code, if the child exited normally.
        code: Option<i32>,
        /// Captured standard error, verbatim.
        stderr: String,
    },
}

/// Run `inv`, exporting `cwd` and the model name to the child.
///
/// # Errors
///
/// Fails if the interpreter cannot be spawned. A failure whose stderr names
/// an unsatisfied dependency becomes [`HubError::MissingDependency`] or
/// [`HubError::DataResourceNotFound`].
pub async fn execute(inv: &Invocation, cwd: &Path) -> Result<DispatchOutcome> {
    let (program, args) = inv.argv();
    tracing::info!(
        program = %program.display(),
        ?args,
        dir = %inv.working_dir.display(),
        "dispatching"
    );

    let output = Command::new(&program)
        .args(&args)
        .current_dir(&inv.working_dir)
        .env(ENV_CMD_CWD, cwd)
        .env(ENV_MODEL_NAME, inv.model.as_str())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if output.status.success() {
        return Ok(DispatchOutcome::Success { stderr });
    }

    match classify_failure(&stderr) {
        Some(Failure::MissingDependency(dependency)) => {
            tracing::debug!(%dependency, "dependency unsatisfied");
            Err(HubError::MissingDependency {
                dependency,
                model: inv.model.clone(),
            })
        }
        Some(Failure::DataResourceNotFound) => {
            Err(HubError::DataResourceNotFound(inv.model.clone()))
        }
        None => Ok(DispatchOutcome::Failed {
            code: output.status.code(),
            stderr,
        }),
    }
}

/// A recognised failure signature in a script's stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A Python module or R package the script imports is missing.
    MissingDependency(String),
    /// The script raised the data-resource sentinel.
    DataResourceNotFound,
}

#[derive(Debug, Clone, Copy)]
enum Signature {
    PythonModule,
    RPackage,
    DataResource,
}

// Checked in order; the first match wins.
const SIGNATURES: [(&str, Signature); 3] = [
    (
        r"ModuleNotFoundError: No module named '(.+?)'",
        Signature::PythonModule,
    ),
    (
        r#"there is no package called [‘'"](.+?)[’'"]"#,
        Signature::RPackage,
    ),
    (r"DataResourceNotFoundException", Signature::DataResource),
];

static MATCHERS: LazyLock<Vec<(Regex, Signature)>> = LazyLock::new(|| {
    SIGNATURES
        .iter()
        .filter_map(|(pattern, sig)| Regex::new(pattern).ok().map(|re| (re, *sig)))
        .collect()
});

/// Classify a failed script's stderr.
///
/// # Example
///
/// ```
/// use mlhub_core::dispatch::{Failure, classify_failure};
///
/// assert_eq!(
///     classify_failure("ModuleNotFoundError: No module named 'pandas'"),
///     Some(Failure::MissingDependency("pandas".into()))
/// );
/// assert_eq!(classify_failure("Segmentation fault"), None);
/// ```
pub fn classify_failure(stderr: &str) -> Option<Failure> {
    MATCHERS.iter().find_map(|(re, sig)| {
        let caps = re.captures(stderr)?;
        Some(match sig {
            Signature::PythonModule | Signature::RPackage => {
                Failure::MissingDependency(caps.get(1)?.as_str().to_string())
            }
            Signature::DataResource => Failure::DataResourceNotFound,
        })
    })
}
