//! Installing a plugin into a located host.
//!
//! The addons directory lives under the install root (`scripts/addons`;
//! macOS keeps it inside `Contents/Resources`). System installs are
//! often root-owned, so a permission failure falls back to the per-user
//! config directory, created on demand.

use std::path::{Path, PathBuf};

use fs_extra::dir::CopyOptions;
use tracing::{info, warn};

use crate::error::CtlError;
use crate::locate::HostInstall;

/// The host's system addons directory for this platform.
pub fn addons_dir(install: &HostInstall) -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        install
            .root
            .join("Contents")
            .join("Resources")
            .join("scripts")
            .join("addons")
    }
    #[cfg(not(target_os = "macos"))]
    {
        install.root.join("scripts").join("addons")
    }
}

/// Per-user fallback when the system directory is not writable.
pub fn user_addons_dir(app: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(app).join("scripts").join("addons"))
}

/// Copies `plugin` (a file or a directory) into the addons directory,
/// overwriting any previous install. Returns the installed path.
pub fn install_plugin(install: &HostInstall, plugin: &Path) -> Result<PathBuf, CtlError> {
    if !plugin.exists() {
        return Err(CtlError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("plugin not found: {}", plugin.display()),
        )));
    }

    let system = addons_dir(install);
    match install_into(&system, plugin) {
        Err(e) if is_permission_denied(&e) => {
            let Some(user) = user_addons_dir(&install.app) else {
                return Err(CtlError::NoAddonsDir(system));
            };
            warn!(
                "no write access to {}; installing to {}",
                system.display(),
                user.display()
            );
            install_into(&user, plugin)
        }
        other => other,
    }
}

fn install_into(target: &Path, plugin: &Path) -> Result<PathBuf, CtlError> {
    std::fs::create_dir_all(target)?;

    let file_name = plugin.file_name().ok_or_else(|| {
        CtlError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "plugin path has no file name",
        ))
    })?;
    let dest = target.join(file_name);

    if plugin.is_dir() {
        let mut options = CopyOptions::new();
        options.overwrite = true;
        options.copy_inside = true;
        fs_extra::dir::copy(plugin, target, &options)?;
    } else {
        std::fs::copy(plugin, &dest)?;
    }

    info!("installed {} -> {}", plugin.display(), dest.display());
    Ok(dest)
}

fn is_permission_denied(err: &CtlError) -> bool {
    match err {
        CtlError::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
        CtlError::Install(e) => match &e.kind {
            fs_extra::error::ErrorKind::PermissionDenied => true,
            fs_extra::error::ErrorKind::Io(io) => {
                io.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        },
        _ => false,
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::HostLocator;

    fn fake_install(root: &Path) -> HostInstall {
        let exe = root.join("fake-host");
        std::fs::write(&exe, b"").unwrap();
        HostLocator::new("fake-host").with_root(&exe).locate().unwrap()
    }

    #[test]
    fn installs_a_plugin_file_and_overwrites_on_reinstall() {
        let root = tempfile::tempdir().unwrap();
        let install = fake_install(root.path());

        let plugin = root.path().join("scenelink_plugin.py");
        std::fs::write(&plugin, b"print('v1')").unwrap();
        let dest = install_plugin(&install, &plugin).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"print('v1')");
        assert!(dest.starts_with(addons_dir(&install)));

        std::fs::write(&plugin, b"print('v2')").unwrap();
        let dest = install_plugin(&install, &plugin).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"print('v2')");
    }

    #[test]
    fn installs_a_plugin_directory_recursively() {
        let root = tempfile::tempdir().unwrap();
        let install = fake_install(root.path());

        let plugin = root.path().join("scenelink_plugin");
        std::fs::create_dir_all(plugin.join("ui")).unwrap();
        std::fs::write(plugin.join("__init__.py"), b"").unwrap();
        std::fs::write(plugin.join("ui").join("panel.py"), b"").unwrap();

        let dest = install_plugin(&install, &plugin).unwrap();
        assert!(dest.join("__init__.py").is_file());
        assert!(dest.join("ui").join("panel.py").is_file());
    }

    #[test]
    fn missing_plugin_is_reported_before_any_copy() {
        let root = tempfile::tempdir().unwrap();
        let install = fake_install(root.path());

        let err = install_plugin(&install, Path::new("/no/such/plugin.py")).unwrap_err();
        assert!(err.to_string().contains("plugin not found"));
        assert!(!addons_dir(&install).exists());
    }

    #[test]
    fn user_addons_dir_is_app_scoped() {
        // Environment-dependent: only check the shape when a config
        // dir exists at all.
        if let Some(dir) = user_addons_dir("fake-host") {
            assert!(dir.ends_with(Path::new("fake-host/scripts/addons")));
        }
    }
}
