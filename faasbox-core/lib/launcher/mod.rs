//! Sandbox launcher for isolated script execution.
//!
//! This module handles:
//! - Building bubblewrap invocations with read-only system binds and private scratch space
//! - Namespace isolation with networking unshared and all capabilities dropped
//! - CPU and memory accounting through transient systemd scopes or a shared slice
//! - Environment scrubbing and per-language entry points
//!
//! Building an invocation never touches the host. Only [`install_slice`] has side effects.

mod invocation;
mod slice;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use invocation::*;
pub use slice::*;

use std::path::PathBuf;

use getset::Getters;
use typed_builder::TypedBuilder;

use crate::config::{Language, ResourceLimits};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The binary that applies resource accounting.
pub const SYSTEMD_RUN: &str = "systemd-run";

/// The binary that applies namespace isolation.
pub const BWRAP: &str = "bwrap";

/// Host directories mapped read-only into every sandbox. Entries marked optional are skipped when
/// the host lacks them.
const SYSTEM_BINDS: &[(&str, bool)] = &[("/usr", false), ("/lib", true), ("/lib64", true)];

/// The private home directory inside the sandbox.
const SANDBOX_HOME: &str = "/home/sandbox";

/// The `PATH` exposed to scripts.
const SANDBOX_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Inherited variables that are always removed.
const SCRUBBED_ENV: &[&str] = &["LD_PRELOAD", "LD_LIBRARY_PATH"];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// How CPU and memory limits are enforced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Accounting {
    /// A transient scope per invocation carries the limits.
    #[default]
    Scope,

    /// Invocations are additionally placed in a shared, pre-installed slice.
    Slice(String),
}

/// Where the pieces a sandbox needs live on the host.
#[derive(Debug, Clone, Getters, TypedBuilder)]
#[getset(get = "pub with_prefix")]
pub struct SandboxLayout {
    /// Directory holding `wrapper.<ext>` for every language.
    #[builder(setter(into))]
    wrapper_dir: PathBuf,

    /// Shared module directory exposed to TypeScript scripts as `NODE_PATH`.
    #[builder(default)]
    module_dir: Option<PathBuf>,

    /// Resource accounting mode.
    #[builder(default)]
    accounting: Accounting,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Builds the isolated invocation that runs `language`'s wrapper under `limits`.
///
/// ## Arguments
///
/// * `language` - Selects the interpreter and the wrapper script
/// * `limits` - CPU quota and memory ceiling applied through systemd
/// * `layout` - Host paths bound into the sandbox and the accounting mode
///
/// ## Example
///
/// ```
/// use faasbox_core::{
///     config::{Language, ResourceLimits},
///     launcher::{self, SandboxLayout},
/// };
///
/// let layout = SandboxLayout::builder().wrapper_dir("/srv/faasbox/wrappers").build();
/// let invocation = launcher::build(Language::Python, &ResourceLimits::default(), &layout);
///
/// assert_eq!(invocation.get_program(), "systemd-run");
/// assert!(invocation.get_args().ends_with(&[
///     "python3".to_string(),
///     "-u".to_string(),
///     "/wrapper.py".to_string(),
/// ]));
/// ```
pub fn build(language: Language, limits: &ResourceLimits, layout: &SandboxLayout) -> Invocation {
    let mut invocation = Invocation::new(SYSTEMD_RUN);

    // Resource accounting
    invocation.args(["--scope", "--user", "--quiet"]);
    if let Accounting::Slice(name) = &layout.accounting {
        invocation.arg(format!("--slice={}", slice_unit_name(name)));
    }
    invocation
        .arg("-p")
        .arg(format!("CPUQuota={}", limits.cpu_quota()))
        .arg("-p")
        .arg(format!("MemoryMax={}", limits.get_memory()))
        .args(["-p", "MemorySwapMax=0", "--"]);

    // Filesystem isolation
    invocation.arg(BWRAP);
    for &(dir, optional) in SYSTEM_BINDS {
        let flag = if optional { "--ro-bind-try" } else { "--ro-bind" };
        invocation.args([flag, dir, dir]);
    }

    let wrapper_name = language.wrapper_file_name();
    let sandbox_wrapper = format!("/{}", wrapper_name);
    invocation
        .arg("--ro-bind")
        .arg(layout.wrapper_dir.join(&wrapper_name).display().to_string())
        .arg(&sandbox_wrapper)
        .args(["--tmpfs", "/tmp", "--proc", "/proc", "--dev", "/dev"]);

    // Namespace isolation
    invocation.args([
        "--unshare-all",
        "--unshare-net",
        "--die-with-parent",
        "--new-session",
        "--cap-drop",
        "ALL",
    ]);

    // Private scratch space and a scrubbed environment
    invocation
        .args(["--chdir", "/tmp", "--tmpfs", SANDBOX_HOME])
        .args(["--setenv", "HOME", SANDBOX_HOME])
        .args(["--setenv", "PATH", SANDBOX_PATH])
        .args(["--setenv", "TMPDIR", "/tmp"])
        .args(["--setenv", "LANG", "C.UTF-8"]);
    for &var in SCRUBBED_ENV {
        invocation.args(["--unsetenv", var]);
    }

    if language == Language::TypeScript {
        if let Some(module_dir) = &layout.module_dir {
            let module_dir = module_dir.display().to_string();
            invocation
                .arg("--ro-bind")
                .arg(&module_dir)
                .arg(&module_dir)
                .args(["--setenv", "NODE_PATH"])
                .arg(&module_dir);
        }
    }

    // Entry point
    invocation
        .arg("--")
        .arg(language.interpreter())
        .args(language.interpreter_flags().iter().copied())
        .arg(sandbox_wrapper);

    invocation
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySize;

    fn position(args: &[String], needle: &str) -> usize {
        args.iter()
            .position(|a| a == needle)
            .unwrap_or_else(|| panic!("{} missing from {:?}", needle, args))
    }

    fn pairs(args: &[String], flag: &str) -> Vec<(String, String)> {
        args.windows(3)
            .filter(|w| w[0] == flag)
            .map(|w| (w[1].clone(), w[2].clone()))
            .collect()
    }

    #[test]
    fn test_build_python_invocation() {
        let layout = SandboxLayout::builder().wrapper_dir("/opt/wrappers").build();
        let limits = ResourceLimits::new(2.0, MemorySize::parse("256M").unwrap()).unwrap();
        let invocation = build(Language::Python, &limits, &layout);
        let args = invocation.get_args();

        assert_eq!(invocation.get_program(), SYSTEMD_RUN);
        assert_eq!(&args[..3], &["--scope", "--user", "--quiet"]);
        assert!(args.contains(&"CPUQuota=200%".to_string()));
        assert!(args.contains(&"MemoryMax=256M".to_string()));
        assert!(args.contains(&"MemorySwapMax=0".to_string()));

        // accounting wraps isolation
        let separator = position(args, "--");
        assert_eq!(args[separator + 1], BWRAP);

        let binds = pairs(args, "--ro-bind");
        assert!(binds.contains(&("/usr".into(), "/usr".into())));
        assert!(binds.contains(&("/opt/wrappers/wrapper.py".into(), "/wrapper.py".into())));
        assert!(pairs(args, "--ro-bind-try").contains(&("/lib64".into(), "/lib64".into())));

        for flag in ["--unshare-all", "--unshare-net", "--die-with-parent", "--new-session"] {
            assert!(args.contains(&flag.to_string()), "{} missing", flag);
        }
        assert_eq!(args[position(args, "--cap-drop") + 1], "ALL");

        assert!(args.ends_with(&["python3".into(), "-u".into(), "/wrapper.py".into()]));
    }

    #[test]
    fn test_build_scrubs_environment() {
        let layout = SandboxLayout::builder().wrapper_dir("/w").build();
        let invocation = build(Language::JavaScript, &ResourceLimits::default(), &layout);
        let args = invocation.get_args();

        let env = pairs(args, "--setenv");
        assert!(env.contains(&("HOME".into(), "/home/sandbox".into())));
        assert!(env.contains(&("TMPDIR".into(), "/tmp".into())));
        assert!(env.contains(&("LANG".into(), "C.UTF-8".into())));

        let unset: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "--unsetenv")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(unset, vec!["LD_PRELOAD", "LD_LIBRARY_PATH"]);

        assert!(args.ends_with(&["node".into(), "/wrapper.js".into()]));
        assert!(!args.iter().any(|a| a == "NODE_PATH"));
    }

    #[test]
    fn test_build_typescript_binds_module_dir() {
        let layout = SandboxLayout::builder()
            .wrapper_dir("/w")
            .module_dir(Some("/srv/node_modules".into()))
            .accounting(Accounting::Slice("faasbox".into()))
            .build();
        let invocation = build(Language::TypeScript, &ResourceLimits::default(), &layout);
        let args = invocation.get_args();

        assert!(args.contains(&"--slice=faasbox.slice".to_string()));
        assert!(pairs(args, "--ro-bind")
            .contains(&("/srv/node_modules".into(), "/srv/node_modules".into())));
        assert!(pairs(args, "--setenv")
            .contains(&("NODE_PATH".into(), "/srv/node_modules".into())));

        // the module bind is still inside bwrap, before the interpreter separator
        let last_separator = args.iter().rposition(|a| a == "--").unwrap();
        assert!(position(args, "NODE_PATH") < last_separator);
        assert!(args.ends_with(&["tsx".into(), "/wrapper.ts".into()]));
    }
}
