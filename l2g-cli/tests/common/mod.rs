//! Catalog fixtures and command builders for CLI tests
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use l2g_storage::Snapshot;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CATALOG: &str = r#"{
  "taxonomies": [],
  "parents": [
    {
      "id": 100,
      "title": "Camiseta Básica",
      "kind": "variable",
      "attributes": {
        "cor": {
          "name": "Cor",
          "value": "Azul | Preto",
          "is_visible": true,
          "is_variation": true,
          "is_taxonomy": false,
          "position": 0
        }
      },
      "children": [
        { "id": 101, "title": "Camiseta Básica", "meta": { "attribute_cor": "Azul" } },
        { "id": 102, "title": "Camiseta Básica", "meta": { "attribute_cor": "Preto" } }
      ]
    }
  ]
}"#;

pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub catalog: PathBuf,
}

impl TestEnvironment {
    /// Temp dir holding `catalog.json` seeded with [`CATALOG`]
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let catalog = temp_dir.path().join("catalog.json");
        std::fs::write(&catalog, CATALOG)?;
        Ok(Self { temp_dir, catalog })
    }

    /// Temp dir without a catalog file
    pub fn empty() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let catalog = temp_dir.path().join("catalog.json");
        Ok(Self { temp_dir, catalog })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// `l2g --store <catalog>` with a clean environment
    pub fn cmd(&self) -> Command {
        let mut cmd = l2g_cmd();
        cmd.arg("--store").arg(&self.catalog);
        cmd
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::load(&self.catalog)?)
    }
}

pub fn l2g_cmd() -> Command {
    let mut cmd = Command::cargo_bin("l2g").expect("l2g binary");
    cmd.env_remove("L2G_CONFIG")
        .env_remove("L2G_STORE")
        .env_remove("L2G_LOG")
        .env("NO_COLOR", "1");
    cmd
}

pub fn child_meta(snapshot: &Snapshot, child: u64, key: &str) -> Option<String> {
    snapshot
        .parents
        .iter()
        .flat_map(|p| p.children.iter())
        .find(|c| c.id.0 == child)
        .and_then(|c| c.meta.get(key).cloned())
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}
