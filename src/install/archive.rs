//! Kernel source tarball download and extraction.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

use crate::fetch::Fetch;

/// Download `url` to `tarball` unless a file of that name already exists.
///
/// Returns `true` if a download happened.
pub fn fetch_tarball(fetcher: &dyn Fetch, url: &str, tarball: &Path) -> Result<bool> {
    if tarball.is_file() {
        info!("  [SKIP] {} already downloaded", tarball.display());
        return Ok(false);
    }

    info!("Downloading {}", url);
    let bytes = fetcher
        .download(url, tarball)
        .with_context(|| format!("downloading kernel source {}", url))?;
    info!(
        "  Downloaded {:.1} MB to {}",
        bytes as f64 / 1024.0 / 1024.0,
        tarball.display()
    );
    Ok(true)
}

/// Unpack a `.tar.gz` into `dest` and check it produced `expected_dir`.
pub fn unpack_tarball(tarball: &Path, dest: &Path, expected_dir: &Path) -> Result<()> {
    info!("Unpacking {}", tarball.display());
    let file =
        File::open(tarball).with_context(|| format!("opening '{}'", tarball.display()))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .with_context(|| format!("unpacking '{}' into '{}'", tarball.display(), dest.display()))?;

    if !expected_dir.is_dir() {
        bail!(
            "unpacking '{}' did not produce '{}'",
            tarball.display(),
            expected_dir.display()
        );
    }
    Ok(())
}

/// Remove the downloaded tarball.
pub fn delete_tarball(tarball: &Path) -> Result<()> {
    fs::remove_file(tarball).with_context(|| format!("deleting '{}'", tarball.display()))?;
    info!("  Deleted {}", tarball.display());
    Ok(())
}

#[cfg(test)]
pub(crate) fn build_source_tarball(dir_name: &str) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let makefile = b"VERSION = 6\nPATCHLEVEL = 6\nSUBLEVEL = 31\n";
    let mut header = tar::Header::new_gnu();
    header.set_size(makefile.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("{}/Makefile", dir_name), &makefile[..])
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}
