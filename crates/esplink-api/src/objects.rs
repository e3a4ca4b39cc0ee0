// Object catalog endpoint
//
// Backends disagree on the catalog shape: some return a plain
// `{id: description}` map, others an array of object descriptors.
// Both are normalised into `ObjectRecord`s here.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{PanelClient, preview};
use crate::error::Error;
use crate::models::ObjectRecord;

/// Catalog route, relative to the base URL.
const OBJECTS_PATH: &str = "api/object/list";

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogBody {
    Map(IndexMap<String, Value>),
    List(Vec<ListedObject>),
}

#[derive(Deserialize)]
struct ListedObject {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    properties: Option<Value>,
}

impl PanelClient {
    /// List every object a sensor channel can be linked to.
    ///
    /// `GET api/object/list`
    pub async fn list_objects(&self) -> Result<Vec<ObjectRecord>, Error> {
        let url = self.url(OBJECTS_PATH)?;
        let body: Value = self.get(url).await?;
        let objects = parse_catalog(&body)?;
        debug!(count = objects.len(), "fetched object catalog");
        Ok(objects)
    }
}

pub(crate) fn parse_catalog(body: &Value) -> Result<Vec<ObjectRecord>, Error> {
    let parsed = CatalogBody::deserialize(body).map_err(|e| {
        let text = body.to_string();
        Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&text)),
            body: text,
        }
    })?;
    Ok(match parsed {
        CatalogBody::Map(map) => map
            .into_iter()
            .map(|(id, desc)| ObjectRecord {
                id,
                description: describe(&desc),
                properties: Vec::new(),
            })
            .collect(),
        CatalogBody::List(items) => items.into_iter().filter_map(ListedObject::into_record).collect(),
    })
}

impl ListedObject {
    fn into_record(self) -> Option<ObjectRecord> {
        let id = self.name.or_else(|| match self.id {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })?;
        Some(ObjectRecord {
            id,
            description: self.description.unwrap_or_default(),
            properties: property_names(self.properties),
        })
    }
}

/// A map value may be a bare description or a nested descriptor.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Properties arrive as a list of names or as a `{name: meta}` map.
fn property_names(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_owned),
                _ => None,
            })
            .collect(),
        Some(Value::Object(map)) => map.into_iter().map(|(k, _)| k).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn map_form_keeps_order() {
        let objects = parse_catalog(&json!({
            "Kitchen": "Kitchen sensors",
            "Garage": {"description": "Garage door"}
        }))
        .unwrap();
        let ids: Vec<_> = objects.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["Kitchen", "Garage"]);
        assert_eq!(objects[1].description, "Garage door");
    }

    #[test]
    fn list_form_prefers_name_and_reads_properties() {
        let objects = parse_catalog(&json!([
            {"id": 7, "name": "Room", "description": "Living room", "properties": ["temp", {"name": "hum"}]},
            {"id": 9, "description": "anonymous"},
            {"description": "no identity"}
        ]))
        .unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id, "Room");
        assert_eq!(objects[0].properties, vec!["temp", "hum"]);
        assert_eq!(objects[1].id, "9");
    }

    #[test]
    fn scalar_body_is_rejected_with_preview() {
        match parse_catalog(&json!(42)) {
            Err(Error::Deserialization { body, .. }) => assert_eq!(body, "42"),
            other => panic!("expected Deserialization error, got: {other:?}"),
        }
    }
}
