use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::error;

use crate::{Error, Result, Uuid};

/// Human-readable name and type of an assigned UUID.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Info {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
}

/// Read-only mapping of characteristic and descriptor UUIDs to their names
/// and types. A missing entry is not an error.
#[derive(Clone, Debug, Default)]
pub struct Table {
    chars: HashMap<Uuid, Info>,
    descs: HashMap<Uuid, Info>,
}

static GLOBAL: Lazy<Table> = Lazy::new(|| {
    Table::load(
        include_str!("../characteristics.json"),
        include_str!("../descriptors.json"),
    )
});

impl Table {
    /// Returns the process-wide table of Bluetooth SIG assigned numbers. The
    /// table is parsed once, on first use.
    #[inline]
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Creates a table from two JSON objects mapping UUID strings to
    /// `{"name": ..., "type": ...}` entries.
    pub fn from_json(chars: &str, descs: &str) -> Result<Self> {
        Ok(Self {
            chars: Self::section(chars)?,
            descs: Self::section(descs)?,
        })
    }

    /// Returns characteristic metadata.
    #[inline]
    #[must_use]
    pub fn characteristic(&self, u: Uuid) -> Option<&Info> {
        self.chars.get(&u)
    }

    /// Returns descriptor metadata.
    #[inline]
    #[must_use]
    pub fn descriptor(&self, u: Uuid) -> Option<&Info> {
        self.descs.get(&u)
    }

    /// Returns the number of characteristic and descriptor entries.
    #[inline]
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        (self.chars.len(), self.descs.len())
    }

    /// Parses the embedded table. Name resolution is optional, so a corrupt
    /// table is logged and replaced by an empty one.
    fn load(chars: &str, descs: &str) -> Self {
        Self::from_json(chars, descs).unwrap_or_else(|e| {
            error!("Embedded metadata table is corrupt: {e}");
            Self::default()
        })
    }

    fn section(json: &str) -> Result<HashMap<Uuid, Info>> {
        let raw: HashMap<String, Info> = serde_json::from_str(json)?;
        (raw.into_iter())
            .map(|(k, v)| Ok::<_, Error>((k.parse::<Uuid>()?, v)))
            .collect()
    }
}
