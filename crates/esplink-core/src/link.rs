// ── Link codec ──
//
// Converts between a sensor's stored link map (`channel -> "object.property"`)
// and the ordered row table an operator edits. Decoding never fails:
// anything that is not exactly two dot-separated segments reads as unlinked.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::Sensor;

/// Separator between object id and property name.
pub const LINK_SEPARATOR: char = '.';

/// Typed form of a stored link string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkValue {
    #[default]
    Unmapped,
    Mapped { object: String, property: String },
}

impl LinkValue {
    pub fn mapped(object: impl Into<String>, property: impl Into<String>) -> Self {
        Self::Mapped {
            object: object.into(),
            property: property.into(),
        }
    }

    /// Parse a stored link. Only exactly two segments map.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(LINK_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(object), Some(property), None) => Self::mapped(object, property),
            _ => Self::Unmapped,
        }
    }

    /// The stored form: `""` or `"object.property"`.
    pub fn to_link_string(&self) -> String {
        self.to_string()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped { .. })
    }

    pub fn object(&self) -> Option<&str> {
        match self {
            Self::Mapped { object, .. } => Some(object),
            Self::Unmapped => None,
        }
    }
}

impl fmt::Display for LinkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmapped => Ok(()),
            Self::Mapped { object, property } => write!(f, "{object}{LINK_SEPARATOR}{property}"),
        }
    }
}

impl FromStr for LinkValue {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// One editable row: a channel and its link target. Empty means blank.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LinkRow {
    pub name: String,
    pub object: String,
    pub property: String,
}

impl LinkRow {
    pub fn blank(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Typed view of the row. A blank object means unmapped.
    pub fn value(&self) -> LinkValue {
        if self.object.is_empty() {
            LinkValue::Unmapped
        } else {
            LinkValue::mapped(&self.object, &self.property)
        }
    }

    pub fn set(&mut self, value: LinkValue) {
        match value {
            LinkValue::Unmapped => self.clear(),
            LinkValue::Mapped { object, property } => {
                self.object = object;
                self.property = property;
            }
        }
    }

    pub fn clear(&mut self) {
        self.object.clear();
        self.property.clear();
    }

    /// Stored form written by [`encode`]. A blank object drops the property.
    fn stored(&self) -> String {
        if self.object.is_empty() {
            String::new()
        } else {
            format!("{}{LINK_SEPARATOR}{}", self.object, self.property)
        }
    }
}

/// Build the editor rows for a sensor.
///
/// One row per `state` channel, in state order. Links for channels that
/// are not reporting are ignored; malformed links yield blank rows.
pub fn decode(sensor: &Sensor) -> Vec<LinkRow> {
    sensor
        .state
        .keys()
        .map(|channel| {
            let mut row = LinkRow::blank(channel.clone());
            if let Some(raw) = sensor.links.get(channel).filter(|l| !l.is_empty()) {
                row.set(LinkValue::parse(raw));
            }
            row
        })
        .collect()
}

/// Write rows back into a link map.
///
/// Every row's channel is written, blank rows as `""`. Keys not named by
/// any row are left alone.
pub fn encode(rows: &[LinkRow], links: &mut IndexMap<String, String>) {
    for row in rows {
        links.insert(row.name.clone(), row.stored());
    }
}
