use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::Data;

const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Flat json file holding the whole bot state.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the data file. A missing, empty or corrupt file is replaced with the
    /// defaults, a partially broken one is repaired and written back.
    pub fn load(&self) -> anyhow::Result<Data> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e).with_context(|| format!("cannot read {}", self.path.display())),
        };
        if raw.trim().is_empty() {
            log::info!("{} not found or is empty, creating a new one", self.path.display());
            let data = Data::default();
            self.save(&data)?;
            return Ok(data);
        }
        let value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::error!("{} is corrupted and cannot be read ({}), creating a fresh one", self.path.display(), e);
                let data = Data::default();
                self.save(&data)?;
                return Ok(data);
            }
        };
        let (data, fixed) = Data::repair(value);
        if fixed {
            log::info!("corrected data structure in {}, saving changes", self.path.display());
            self.save(&data)?;
        }
        Ok(data)
    }

    pub fn save(&self, data: &Data) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(TEMP_FILE_SUFFIX);
        let tmp = PathBuf::from(tmp);
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&tmp, json).with_context(|| format!("cannot write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("cannot replace {}", self.path.display()))?;
        Ok(())
    }
}
