//! Symlinks tying the unpacked tree into the host.
//!
//! - `<dest>/linux` points at the current `linux-<hash>` tree
//! - `/lib/modules/<release>/{build,source}` point at `<dest>/linux`, which
//!   is where out-of-tree module builds look for kernel headers

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Create a symlink at `link`, replacing an existing symlink or file.
///
/// An existing symlink is always replaced; a later run pointing at a newer
/// tree takes precedence. A real directory is never removed.
pub fn replace_symlink(link: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating '{}'", parent.display()))?;
    }
    if link.is_symlink() || link.is_file() {
        fs::remove_file(link).with_context(|| format!("removing '{}'", link.display()))?;
    } else if link.is_dir() {
        bail!(
            "'{}' exists and is not a symlink; move it aside",
            link.display()
        );
    }
    std::os::unix::fs::symlink(target, link).with_context(|| {
        format!(
            "linking '{}' -> '{}'",
            link.display(),
            target.display()
        )
    })?;
    Ok(())
}

/// Point `<modules_root>/<release>/{build,source}` at `linux_link`.
pub fn link_module_dirs(modules_root: &Path, release: &str, linux_link: &Path) -> Result<()> {
    let release_dir = modules_root.join(release);
    for name in ["build", "source"] {
        replace_symlink(&release_dir.join(name), linux_link)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_symlink_creates_link() {
        let temp = tempfile::tempdir().unwrap();
        let link = temp.path().join("linux");

        replace_symlink(&link, Path::new("linux-abc")).unwrap();

        assert!(link.is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("linux-abc"));
    }

    #[test]
    fn test_replace_symlink_overwrites_existing() {
        let temp = tempfile::tempdir().unwrap();
        let link = temp.path().join("linux");

        replace_symlink(&link, Path::new("linux-old")).unwrap();
        replace_symlink(&link, Path::new("linux-new")).unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), Path::new("linux-new"));
    }

    #[test]
    fn test_replace_symlink_keeps_real_directory() {
        let temp = tempfile::tempdir().unwrap();
        let link = temp.path().join("linux");
        let patch = link.join("drivers").join("my_patch.c");
        fs::create_dir_all(patch.parent().unwrap()).unwrap();
        fs::write(&patch, "int x;\n").unwrap();

        let err = replace_symlink(&link, Path::new("linux-f00dfeed")).unwrap_err();

        assert!(err.to_string().contains("is not a symlink"), "{err}");
        assert!(patch.is_file());
        assert!(!link.is_symlink());
    }

    #[test]
    fn test_replace_symlink_replaces_file() {
        let temp = tempfile::tempdir().unwrap();
        let link = temp.path().join("build");
        fs::write(&link, "stale").unwrap();

        replace_symlink(&link, Path::new("/root/linux")).unwrap();

        assert!(link.is_symlink());
    }

    #[test]
    fn test_replace_symlink_replaces_link_to_directory() {
        let temp = tempfile::tempdir().unwrap();
        let old_tree = temp.path().join("linux-old");
        fs::create_dir(&old_tree).unwrap();
        let link = temp.path().join("linux");
        std::os::unix::fs::symlink(&old_tree, &link).unwrap();

        replace_symlink(&link, Path::new("linux-new")).unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), Path::new("linux-new"));
        assert!(old_tree.is_dir());
    }

    #[test]
    fn test_link_module_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let linux = temp.path().join("linux");

        link_module_dirs(temp.path(), "6.6.31+rpt-rpi-v8", &linux).unwrap();

        for name in ["build", "source"] {
            let link = temp.path().join("6.6.31+rpt-rpi-v8").join(name);
            assert_eq!(fs::read_link(&link).unwrap(), linux);
        }
    }
}
