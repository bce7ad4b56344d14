use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::PresenceError;

/// Map/mode tables shipped with the binary.
const BUILTIN_CONTENT: &str = include_str!("../assets/content.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapInfo {
    pub id: String,
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModeInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    version: u32,
    unknown_map: String,
    unknown_mode: String,
    #[serde(default)]
    maps: Vec<MapInfo>,
    #[serde(default)]
    modes: Vec<ModeInfo>,
}

/// Lookup tables from game asset paths to display names and image keys.
#[derive(Debug, Clone)]
pub struct ContentTables {
    pub version: u32,
    pub unknown_map: String,
    pub unknown_mode: String,
    maps: HashMap<String, MapInfo>,
    modes: HashMap<String, ModeInfo>,
}

impl ContentTables {
    /// Tables embedded at build time.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CONTENT).context("built-in content tables are invalid")
    }

    /// Load tables from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Load from `path` when given, otherwise use the built-in tables.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let file: ContentFile = toml::from_str(contents)?;
        Ok(Self {
            version: file.version,
            unknown_map: file.unknown_map,
            unknown_mode: file.unknown_mode,
            maps: file.maps.into_iter().map(|m| (m.id.clone(), m)).collect(),
            modes: file.modes.into_iter().map(|m| (m.id.clone(), m)).collect(),
        })
    }

    pub fn map(&self, id: &str) -> Result<&MapInfo, PresenceError> {
        self.maps.get(id).ok_or_else(|| PresenceError::UnknownIdentifier {
            kind: "map",
            id: id.to_string(),
        })
    }

    pub fn mode(&self, id: &str) -> Result<&ModeInfo, PresenceError> {
        self.modes.get(id).ok_or_else(|| PresenceError::UnknownIdentifier {
            kind: "mode",
            id: id.to_string(),
        })
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_parse() {
        let tables = ContentTables::builtin().unwrap();
        assert!(tables.map_count() >= 7);
        assert!(tables.mode_count() >= 7);
        assert_eq!(tables.unknown_map, "Unknown Map");
    }

    #[test]
    fn ascent_resolves() {
        let tables = ContentTables::builtin().unwrap();
        let map = tables.map("/Game/Maps/Ascent/Ascent").unwrap();
        assert_eq!(map.name, "Ascent");
        assert_eq!(map.image, "ascent");
    }

    #[test]
    fn internal_map_names_differ_from_display() {
        let tables = ContentTables::builtin().unwrap();
        assert_eq!(tables.map("/Game/Maps/Duality/Duality").unwrap().name, "Bind");
        assert_eq!(tables.map("/Game/Maps/Port/Port").unwrap().name, "Icebox");
    }

    #[test]
    fn bomb_mode_is_unrated() {
        let tables = ContentTables::builtin().unwrap();
        let mode = tables
            .mode("/Game/GameModes/Bomb/BombGameMode.BombGameMode_C")
            .unwrap();
        assert_eq!(mode.name, "Unrated");
    }

    #[test]
    fn unknown_identifier_reported() {
        let tables = ContentTables::builtin().unwrap();
        let err = tables.map("/Game/Maps/Nowhere/Nowhere").unwrap_err();
        assert!(matches!(err, PresenceError::UnknownIdentifier { kind: "map", .. }));
    }

    #[test]
    fn override_file_replaces_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.toml");
        std::fs::write(
            &path,
            r#"
            version = 99
            unknown_map = "???"
            unknown_mode = "Custom"

            [[maps]]
            id = "/Game/Maps/New/New"
            name = "Newmap"
            image = "newmap"
            "#,
        )
        .unwrap();
        let tables = ContentTables::load_or_builtin(Some(&path)).unwrap();
        assert_eq!(tables.version, 99);
        assert_eq!(tables.map("/Game/Maps/New/New").unwrap().name, "Newmap");
        assert!(tables.map("/Game/Maps/Ascent/Ascent").is_err());
        assert_eq!(tables.mode_count(), 0);
    }
}
