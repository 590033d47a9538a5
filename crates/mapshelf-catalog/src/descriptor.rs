//! Map descriptor model
//!
//! A map descriptor is the content of a `map.yml` file: the map name, the
//! download version of the map, and the games (XML files) the map contains.
//!
//! ```yaml
//! map_name: Big World
//! version: 3
//! games:
//!   - name: Big World 1942
//!     xml_path: map/games/big_world_1942.xml
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::CatalogError;

/// Accept only YAML string scalars; `123` or `true` where text belongs is an error
///
/// An explicit null reads as empty, which the validity rules then reject.
fn string_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_yaml_ng::Value::deserialize(deserializer)? {
        serde_yaml_ng::Value::String(text) => Ok(text),
        serde_yaml_ng::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "expected a string, found {:?}",
            other
        ))),
    }
}

/// One playable game inside a map
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GameEntry {
    #[serde(deserialize_with = "string_scalar")]
    name: String,
    #[serde(deserialize_with = "string_scalar")]
    xml_path: String,
}

impl GameEntry {
    pub fn new(name: impl Into<String>, xml_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            xml_path: xml_path.into(),
        }
    }

    /// Display name of the game
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the game XML relative to the map root
    pub fn xml_path(&self) -> &str {
        &self.xml_path
    }
}

/// A validated map descriptor
///
/// Only obtainable through [`DescriptorBuilder::build`], so every instance
/// has a non-blank name, a version, and at least one fully named game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MapDescriptor {
    map_name: String,
    version: u32,
    games: Vec<GameEntry>,
}

impl MapDescriptor {
    pub fn builder() -> DescriptorBuilder {
        DescriptorBuilder::default()
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn games(&self) -> &[GameEntry] {
        &self.games
    }

    /// XML path of the game with exactly this name
    pub fn game_xml_path(&self, game_name: &str) -> Option<&str> {
        self.games
            .iter()
            .find(|game| game.name == game_name)
            .map(GameEntry::xml_path)
    }

    /// Back to a builder, e.g. to derive a modified descriptor
    pub fn to_builder(&self) -> DescriptorBuilder {
        DescriptorBuilder {
            map_name: self.map_name.clone(),
            version: Some(self.version),
            games: self.games.clone(),
        }
    }
}

/// Descriptor under construction
///
/// This is also the shape the YAML decoder fills in, so it may hold anything
/// a file on disk contained, including incomplete data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorBuilder {
    #[serde(deserialize_with = "string_scalar")]
    map_name: String,
    version: Option<u32>,
    games: Vec<GameEntry>,
}

impl DescriptorBuilder {
    pub fn map_name(mut self, map_name: impl Into<String>) -> Self {
        self.map_name = map_name.into();
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn game(mut self, name: impl Into<String>, xml_path: impl Into<String>) -> Self {
        self.games.push(GameEntry::new(name, xml_path));
        self
    }

    pub fn games(mut self, games: Vec<GameEntry>) -> Self {
        self.games = games;
        self
    }

    pub fn current_map_name(&self) -> &str {
        &self.map_name
    }

    pub fn current_version(&self) -> Option<u32> {
        self.version
    }

    pub fn current_games(&self) -> &[GameEntry] {
        &self.games
    }

    /// Every rule this descriptor breaks, empty when it is valid
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if self.map_name.trim().is_empty() {
            problems.push("map_name is blank");
        }
        if self.version.is_none() {
            problems.push("version is missing");
        }
        if self.games.is_empty() {
            problems.push("games list is empty");
        }
        if self.games.iter().any(|game| game.name.trim().is_empty()) {
            problems.push("a game has a blank name");
        }
        if self.games.iter().any(|game| game.xml_path.trim().is_empty()) {
            problems.push("a game has a blank xml_path");
        }
        problems
    }

    pub fn is_valid(&self) -> bool {
        self.problems().is_empty()
    }

    /// Freeze into a [`MapDescriptor`], or explain what is wrong with it
    pub fn build(self) -> Result<MapDescriptor, CatalogError> {
        let problems = self.problems();
        match self.version {
            Some(version) if problems.is_empty() => Ok(MapDescriptor {
                map_name: self.map_name,
                version,
                games: self.games,
            }),
            _ => Err(CatalogError::MalformedDescriptor(format!(
                "{}; parsed data: {:?}",
                problems.join(", "),
                self
            ))),
        }
    }
}
