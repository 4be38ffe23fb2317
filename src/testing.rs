//! In-memory host and network doubles shared by unit tests.

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::board::HostProbe;
use crate::fetch::Fetch;

pub struct FakeHost {
    machine: String,
    release: String,
    page_size: u64,
    files: BTreeMap<PathBuf, Vec<u8>>,
    pub loaded_modules: RefCell<Vec<String>>,
}

impl FakeHost {
    pub fn new(machine: &str, page_size: u64) -> Self {
        Self {
            machine: machine.to_string(),
            release: "6.6.31+rpt-rpi-v8".to_string(),
            page_size,
            files: BTreeMap::new(),
            loaded_modules: RefCell::new(Vec::new()),
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        self.files.insert(path.into(), contents);
        self
    }
}

impl HostProbe for FakeHost {
    fn machine(&self) -> Result<String> {
        Ok(self.machine.clone())
    }

    fn kernel_release(&self) -> Result<String> {
        Ok(self.release.clone())
    }

    fn page_size(&self) -> Result<u64> {
        Ok(self.page_size)
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn load_module(&self, name: &str) -> Result<()> {
        self.loaded_modules.borrow_mut().push(name.to_string());
        Ok(())
    }
}

/// Serves canned bodies and records every URL requested.
#[derive(Default)]
pub struct FakeFetcher {
    bodies: BTreeMap<String, Vec<u8>>,
    pub requested: RefCell<BTreeSet<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    fn body(&self, url: &str) -> Result<&Vec<u8>> {
        self.requested.borrow_mut().insert(url.to_string());
        match self.bodies.get(url) {
            Some(body) => Ok(body),
            None => bail!("GET {} failed with HTTP 404 Not Found: 404: Not Found", url),
        }
    }
}

impl Fetch for FakeFetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(self.body(url)?).into_owned())
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let body = self.body(url)?;
        fs::write(dest, body)?;
        Ok(body.len() as u64)
    }
}

/// Gzip `data` in memory.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
