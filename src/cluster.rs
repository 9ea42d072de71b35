//! Cluster context detection and tool preflight.
//!
//! The install step needs to know whether the active kubectl context points
//! at a kind cluster: kind nodes run containerd, so the chaos daemon must be
//! told the runtime and its socket path. Detection happens once, before the
//! plan is built, and the answer is threaded through as plain data.

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::{clog_debug, clog_trace};

/// Query the active kubectl context name.
///
/// Runs `kubectl config current-context` and returns its trimmed stdout.
/// Fails when kubectl exits non-zero (no kubeconfig, no current context) or
/// cannot be spawned; deployment does not proceed without a known target.
pub async fn current_context() -> Result<String> {
    let output = Command::new("kubectl")
        .args(["config", "current-context"])
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::ClusterContext(format!(
            "kubectl config current-context failed: {}",
            stderr.trim()
        )));
    }

    let context = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if context.is_empty() {
        return Err(Error::ClusterContext(
            "kubectl reported an empty context name".to_string(),
        ));
    }

    clog_debug!("Active cluster context: {}", context);
    Ok(context)
}

/// Whether a context name refers to a kind cluster.
///
/// kind names its contexts `kind-<cluster>`, but users rename them, so this
/// matches the substring anywhere in the name.
pub fn is_kind_context(context: &str) -> bool {
    context.contains("kind")
}

/// Verify the external tools the plan will invoke are on PATH.
///
/// `helm` and `kubectl` are always required; `make` only when images are
/// being built. Checking upfront turns a mid-deployment spawn failure into
/// an immediate, nameable error.
pub fn preflight(build_images: bool) -> Result<()> {
    resolve_all(&required_binaries(build_images))
}

fn required_binaries(build_images: bool) -> Vec<&'static str> {
    let mut required = vec!["helm", "kubectl"];
    if build_images {
        required.push("make");
    }
    required
}

fn resolve_all(binaries: &[&str]) -> Result<()> {
    for binary in binaries {
        let path = which::which(binary).map_err(|_| Error::BinaryNotFound(binary.to_string()))?;
        clog_trace!("Preflight: {} -> {}", binary, path.display());
    }
    Ok(())
}
