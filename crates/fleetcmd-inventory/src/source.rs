//! Directory-based inventory source
//!
//! An inventory directory holds up to three documents, either in the Nornir
//! YAML layout or as TOML:
//!
//! - `hosts.yaml` / `hosts.toml` (required): one mapping per host, with an
//!   optional `groups` list and any host-level settings
//! - `groups.yaml` / `groups.toml` (optional): one mapping of settings per group
//! - `defaults.yaml` / `defaults.toml` (optional): a single mapping of default
//!   settings
//!
//! The format is picked from the hosts document. YAML wins when both exist,
//! and `groups` and `defaults` are read in the same format.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::InventoryError;
use crate::store::InventoryStore;
use crate::types::{Groups, Hosts, Settings};

pub const HOSTS_FILE: &str = "hosts";
pub const GROUPS_FILE: &str = "groups";
pub const DEFAULTS_FILE: &str = "defaults";

/// On-disk encoding of the inventory documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Nornir-style `.yaml` (or `.yml`) documents
    Yaml,
    /// `.toml` documents
    Toml,
}

impl DocumentFormat {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            DocumentFormat::Yaml => &["yaml", "yml"],
            DocumentFormat::Toml => &["toml"],
        }
    }

    fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T, String> {
        match self {
            DocumentFormat::Yaml => serde_norway::from_str(content).map_err(|e| e.to_string()),
            DocumentFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Loads an inventory from a directory of YAML or TOML documents
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this source reads from
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read all documents into a store
    ///
    /// # Errors
    /// Fails when the directory or the hosts document is missing, or when any
    /// present document cannot be read or parsed.
    pub fn load(&self) -> Result<InventoryStore, InventoryError> {
        if !self.dir.is_dir() {
            return Err(InventoryError::DirectoryNotFound(
                self.dir.display().to_string(),
            ));
        }

        let (format, hosts_path) = [DocumentFormat::Yaml, DocumentFormat::Toml]
            .into_iter()
            .find_map(|format| self.find(format, HOSTS_FILE).map(|path| (format, path)))
            .ok_or_else(|| InventoryError::HostsFileMissing(self.dir.display().to_string()))?;

        if format == DocumentFormat::Yaml && self.find(DocumentFormat::Toml, HOSTS_FILE).is_some() {
            warn!(dir = %self.dir.display(), "both YAML and TOML hosts documents found, using YAML");
        }

        let hosts: Hosts = read_document(format, &hosts_path)?;
        let groups: Groups = self.read_optional(format, GROUPS_FILE)?;
        let defaults: Settings = self.read_optional(format, DEFAULTS_FILE)?;

        info!(
            dir = %self.dir.display(),
            format = ?format,
            hosts = hosts.len(),
            groups = groups.len(),
            "loaded inventory"
        );

        Ok(InventoryStore::new(hosts, groups, defaults))
    }

    fn find(&self, format: DocumentFormat, stem: &str) -> Option<PathBuf> {
        format
            .extensions()
            .iter()
            .map(|ext| self.dir.join(format!("{stem}.{ext}")))
            .find(|path| path.is_file())
    }

    fn read_optional<T: DeserializeOwned + Default>(
        &self,
        format: DocumentFormat,
        stem: &str,
    ) -> Result<T, InventoryError> {
        match self.find(format, stem) {
            Some(path) => read_document(format, &path),
            None => {
                debug!(dir = %self.dir.display(), document = stem, "optional inventory document absent");
                Ok(T::default())
            }
        }
    }
}

fn read_document<T: DeserializeOwned + Default>(
    format: DocumentFormat,
    path: &Path,
) -> Result<T, InventoryError> {
    let content = std::fs::read_to_string(path).map_err(|e| InventoryError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    // An empty YAML document is null, not an empty mapping.
    if content.trim().is_empty() {
        return Ok(T::default());
    }

    format.parse(&content).map_err(|message| InventoryError::Parse {
        path: path.display().to_string(),
        message,
    })
}
