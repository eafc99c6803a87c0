use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::impls::file_safe;
use crate::registry::Registry;

/// Uploaded `.txt` pools, one number per line, named `<main>_<sub>.txt`.
#[derive(Debug, Clone)]
pub struct NumberPool {
    dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Taken {
    Number(String),
    Exhausted,
    Missing,
}

impl NumberPool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, main: &str, sub: &str) -> PathBuf {
        self.dir.join(file_safe(&format!("{}_{}.txt", main, sub)))
    }

    /// Replaces the pool with the uploaded content.
    pub async fn store(&self, main: &str, sub: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("cannot create {}", self.dir.display()))?;
        let path = self.path(main, sub);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }

    /// Returns `true` if there was a pool to remove.
    pub async fn remove(&self, main: &str, sub: &str) -> anyhow::Result<bool> {
        let path = self.path(main, sub);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("cannot remove {}", path.display())),
        }
    }

    pub async fn take(&self, main: &str, sub: &str, index: usize) -> anyhow::Result<Taken> {
        let path = self.path(main, sub);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Taken::Missing),
            Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
        };
        Ok(match content.lines().nth(index) {
            Some(line) => Taken::Number(line.trim().to_owned()),
            None => Taken::Exhausted,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispensed {
    Number(String),
    Cooldown(Duration),
    Exhausted,
    Missing,
}

/// Hands out numbers one at a time with a cooldown shared by every user.
pub struct Dispenser {
    cooldown: Duration,
    last: Mutex<Option<Instant>>,
}

impl Dispenser {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown, last: Mutex::new(None) }
    }

    pub async fn dispense(&self, registry: &Registry, pool: &NumberPool, main: &str, sub: &str) -> anyhow::Result<Dispensed> {
        let mut last = self.last.lock().await;
        let now = Instant::now();
        if let Some(at) = *last {
            let ready = at + self.cooldown;
            if now < ready {
                return Ok(Dispensed::Cooldown(ready - now));
            }
        }
        let index = registry.progress(main, sub);
        let dispensed = match pool.take(main, sub, index).await? {
            Taken::Number(number) => {
                registry.set_progress(main, sub, index + 1);
                *last = Some(now);
                Dispensed::Number(number)
            }
            Taken::Exhausted => Dispensed::Exhausted,
            Taken::Missing => Dispensed::Missing,
        };
        Ok(dispensed)
    }
}
