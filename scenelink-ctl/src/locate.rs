//! Finding a host application on this machine.
//!
//! Hosts install in OS-conventional places: versioned vendor
//! directories under Program Files on Windows, an `.app` bundle under
//! `/Applications` on macOS, and a binary on the usual `PATH`
//! directories on Linux. The locator searches those, or takes an
//! explicit root when the user knows better.

use std::path::{Path, PathBuf};

use crate::error::CtlError;

/// Default vendor directory searched under Program Files.
pub const DEFAULT_VENDOR: &str = "SceneLink";

// ── HostInstall ──────────────────────────────────────────────────

/// A located host installation.
#[derive(Debug, Clone)]
pub struct HostInstall {
    /// Application name the search was for.
    pub app: String,
    /// Install root: the version directory on Windows, the `.app`
    /// bundle on macOS, the binary's directory on Linux.
    pub root: PathBuf,
    /// The host executable itself.
    pub executable: PathBuf,
}

// ── HostLocator ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HostLocator {
    app: String,
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    vendor: String,
    override_root: Option<PathBuf>,
}

impl HostLocator {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            vendor: DEFAULT_VENDOR.into(),
            override_root: None,
        }
    }

    /// Vendor directory to search under Program Files (Windows only).
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Skip the search and use this root (or executable) directly.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.override_root = Some(root.into());
        self
    }

    /// Finds the installation, or reports where the search looked.
    pub fn locate(&self) -> Result<HostInstall, CtlError> {
        if let Some(root) = &self.override_root {
            // Pointing straight at the executable is accepted too.
            if root.is_file() {
                return Ok(HostInstall {
                    app: self.app.clone(),
                    root: root.parent().unwrap_or(Path::new(".")).to_path_buf(),
                    executable: root.clone(),
                });
            }
            return self.from_root(root);
        }
        self.search()
    }

    fn from_root(&self, root: &Path) -> Result<HostInstall, CtlError> {
        let executable = executable_under(root, &self.app);
        if !executable.exists() {
            return Err(CtlError::HostNotFound(format!(
                "no executable at {}",
                executable.display()
            )));
        }
        Ok(HostInstall {
            app: self.app.clone(),
            root: root.to_path_buf(),
            executable,
        })
    }

    #[cfg(target_os = "windows")]
    fn search(&self) -> Result<HostInstall, CtlError> {
        let bases = [
            PathBuf::from(r"C:\Program Files").join(&self.vendor),
            PathBuf::from(r"C:\Program Files (x86)").join(&self.vendor),
        ];
        for base in bases {
            if !base.is_dir() {
                continue;
            }
            // Installs keep one subdirectory per version; absent that,
            // the vendor directory itself is the install.
            let root = newest_version_dir(&base).unwrap_or(base);
            if let Ok(install) = self.from_root(&root) {
                return Ok(install);
            }
        }
        Err(CtlError::HostNotFound(format!(
            "no {} install under Program Files\\{}",
            self.app, self.vendor
        )))
    }

    #[cfg(target_os = "macos")]
    fn search(&self) -> Result<HostInstall, CtlError> {
        let bundle = PathBuf::from("/Applications").join(format!("{}.app", self.app));
        if bundle.is_dir() {
            return self.from_root(&bundle);
        }
        Err(CtlError::HostNotFound(format!(
            "no {}.app under /Applications",
            self.app
        )))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    fn search(&self) -> Result<HostInstall, CtlError> {
        for dir in ["/usr/bin", "/usr/local/bin", "/snap/bin"] {
            let candidate = Path::new(dir).join(&self.app);
            if !candidate.exists() {
                continue;
            }
            // Resolve symlinks so the root is the real install dir.
            let executable = std::fs::canonicalize(&candidate).unwrap_or(candidate);
            let root = executable
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(dir));
            return Ok(HostInstall {
                app: self.app.clone(),
                root,
                executable,
            });
        }
        Err(CtlError::HostNotFound(format!(
            "{} not in /usr/bin, /usr/local/bin or /snap/bin",
            self.app
        )))
    }
}

// ── Path layout ──────────────────────────────────────────────────

#[cfg(target_os = "windows")]
fn executable_under(root: &Path, app: &str) -> PathBuf {
    root.join(format!("{app}.exe"))
}

#[cfg(target_os = "macos")]
fn executable_under(root: &Path, app: &str) -> PathBuf {
    root.join("Contents").join("MacOS").join(app)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn executable_under(root: &Path, app: &str) -> PathBuf {
    root.join(app)
}

/// The subdirectory of `base` with the highest version-looking name.
///
/// Versions compare numerically component-wise, so `4.10` outranks
/// `4.9`; names without digits lose to any versioned name.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn newest_version_dir(base: &Path) -> Option<PathBuf> {
    let mut dirs: Vec<(Vec<u32>, String, PathBuf)> = std::fs::read_dir(base)
        .ok()?
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            (version_components(&name), name, e.path())
        })
        .collect();
    dirs.sort();
    dirs.pop().map(|(_, _, path)| path)
}

fn version_components(name: &str) -> Vec<u32> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────
