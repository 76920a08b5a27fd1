use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub trait Storage<T> {
    /// Charge un document depuis un support.
    fn load(&self) -> anyhow::Result<T>;
    /// Sauvegarde de manière atomique.
    fn save(&self, value: &T) -> anyhow::Result<()>;
}

/// Fichier JSON ; le chemin `-` désigne stdin en lecture.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }

    fn read_bytes(&self) -> anyhow::Result<Vec<u8>> {
        if self.is_stdin() {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            if buf.is_empty() {
                anyhow::bail!("no JSON received on stdin");
            }
            return Ok(buf);
        }
        fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))
    }
}

impl<T> Storage<T> for JsonStorage
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> anyhow::Result<T> {
        let data = self.read_bytes()?;
        let value = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(value)
    }

    fn save(&self, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }
}
