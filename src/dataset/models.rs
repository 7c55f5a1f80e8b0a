use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Product variant tracked with its own version list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Fasm1,
    Fasmg,
}

impl Edition {
    /// Scan order used by both commands.
    pub const ALL: [Edition; 2] = [Edition::Fasm1, Edition::Fasmg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Edition::Fasm1 => "fasm1",
            Edition::Fasmg => "fasmg",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target environment with its own downloadable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Unix,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Unix => "unix",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys of a JSON object this tool does not model, plus the order every key
/// was read in. Rewriting puts each key back where it was; keys that were
/// not there before go last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extra {
    order: Vec<String>,
    fields: Map<String, Value>,
}

impl Extra {
    /// Split `map` into the `known` keys and the rest.
    fn split(map: Map<String, Value>, known: &[&str]) -> (Self, Map<String, Value>) {
        let order = map.keys().cloned().collect();
        let (known, fields): (Map<String, Value>, Map<String, Value>) =
            map.into_iter().partition(|(key, _)| known.contains(&key.as_str()));
        (Self { order, fields }, known)
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn join(&self, mut known: Map<String, Value>) -> Map<String, Value> {
        let mut object = Map::new();
        for key in &self.order {
            if let Some(value) = known.remove(key).or_else(|| self.fields.get(key).cloned()) {
                object.insert(key.clone(), value);
            }
        }
        object.extend(known);
        object
    }
}

fn take<T: DeserializeOwned>(known: &mut Map<String, Value>, key: &'static str) -> Result<Option<T>, serde_json::Error> {
    known.remove(key).map(serde_json::from_value).transpose()
}

fn require<T: DeserializeOwned>(known: &mut Map<String, Value>, key: &'static str) -> Result<T, serde_json::Error> {
    take(known, key)?.ok_or_else(|| serde_json::Error::missing_field(key))
}

fn to_value<T: Serialize, S: Serializer>(value: &T) -> Result<Value, S::Error> {
    serde_json::to_value(value).map_err(S::Error::custom)
}

/// One released version and the digests of its artifacts, keyed in the
/// order the file lists them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Version {
    pub(crate) name: String,
    pub(crate) hashes: Option<IndexMap<Platform, String>>,
    pub(crate) extra: Extra,
}

impl Version {
    pub fn new(name: impl Into<String>, hashes: IndexMap<Platform, String>) -> Self {
        Self {
            name: name.into(),
            hashes: Some(hashes),
            extra: Extra::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hashes(&self) -> Option<&IndexMap<Platform, String>> {
        self.hashes.as_ref()
    }

    #[cfg(test)]
    pub fn hash(&self, platform: Platform) -> Option<&str> {
        self.hashes.as_ref()?.get(&platform).map(String::as_str)
    }

    /// Replace the digest for `platform`, returning the previous one. A
    /// replaced digest keeps its position; a new platform goes last.
    pub fn set_hash(&mut self, platform: Platform, digest: String) -> Option<String> {
        self.hashes.get_or_insert_with(IndexMap::new).insert(platform, digest)
    }
}

impl TryFrom<Map<String, Value>> for Version {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let (extra, mut known) = Extra::split(map, &["name", "hashes"]);
        Ok(Self {
            name: require(&mut known, "name")?,
            hashes: take(&mut known, "hashes")?,
            extra,
        })
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut known = Map::new();
        known.insert("name".into(), Value::String(self.name.clone()));
        if let Some(hashes) = &self.hashes {
            known.insert("hashes".into(), to_value::<_, S>(hashes)?);
        }
        self.extra.join(known).serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct EditionRecord {
    pub(crate) versions: Vec<Version>,
    pub(crate) extra: Extra,
}

impl TryFrom<Map<String, Value>> for EditionRecord {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let (extra, mut known) = Extra::split(map, &["versions"]);
        Ok(Self {
            versions: take(&mut known, "versions")?.unwrap_or_default(),
            extra,
        })
    }
}

impl Serialize for EditionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut known = Map::new();
        known.insert("versions".into(), to_value::<_, S>(&self.versions)?);
        self.extra.join(known).serialize(serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Editions {
    pub(crate) fasm1: EditionRecord,
    pub(crate) fasmg: EditionRecord,
    pub(crate) extra: Extra,
}

impl TryFrom<Map<String, Value>> for Editions {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let (extra, mut known) = Extra::split(map, &[Edition::Fasm1.as_str(), Edition::Fasmg.as_str()]);
        Ok(Self {
            fasm1: take(&mut known, Edition::Fasm1.as_str())?.unwrap_or_default(),
            fasmg: take(&mut known, Edition::Fasmg.as_str())?.unwrap_or_default(),
            extra,
        })
    }
}

impl Serialize for Editions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut known = Map::new();
        known.insert(Edition::Fasm1.as_str().into(), to_value::<_, S>(&self.fasm1)?);
        known.insert(Edition::Fasmg.as_str().into(), to_value::<_, S>(&self.fasmg)?);
        self.extra.join(known).serialize(serializer)
    }
}

/// The JSON document of record. Keys this tool does not know about are
/// carried through a rewrite untouched and in place.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Dataset {
    pub(crate) editions: Editions,
    pub(crate) extra: Extra,
}

impl TryFrom<Map<String, Value>> for Dataset {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let (extra, mut known) = Extra::split(map, &["editions"]);
        Ok(Self {
            editions: require(&mut known, "editions")?,
            extra,
        })
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut known = Map::new();
        known.insert("editions".into(), to_value::<_, S>(&self.editions)?);
        self.extra.join(known).serialize(serializer)
    }
}

impl Dataset {
    fn record(&self, edition: Edition) -> &EditionRecord {
        match edition {
            Edition::Fasm1 => &self.editions.fasm1,
            Edition::Fasmg => &self.editions.fasmg,
        }
    }

    fn record_mut(&mut self, edition: Edition) -> &mut EditionRecord {
        match edition {
            Edition::Fasm1 => &mut self.editions.fasm1,
            Edition::Fasmg => &mut self.editions.fasmg,
        }
    }

    /// Versions of `edition`, newest first.
    pub fn versions(&self, edition: Edition) -> &[Version] {
        &self.record(edition).versions
    }

    pub fn versions_mut(&mut self, edition: Edition) -> &mut Vec<Version> {
        &mut self.record_mut(edition).versions
    }

    pub fn contains(&self, edition: Edition, name: &str) -> bool {
        self.versions(edition).iter().any(|v| v.name() == name)
    }

    /// Insert each version at the front of the list, in the given order, so
    /// the last one supplied ends up first.
    pub fn prepend(&mut self, edition: Edition, versions: impl IntoIterator<Item = Version>) {
        let list = self.versions_mut(edition);
        for version in versions {
            list.insert(0, version);
        }
    }
}
