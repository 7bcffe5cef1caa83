// JSON export of a decoded model.
//
// Key order is fixed (serde_json's preserve_order), and every collection is emitted in a
// deterministic order, so exporting the same file twice gives identical text.

use crate::FarmModel;
use serde_json::{json, Map, Value};

/// Builds the JSON document for a model.
pub fn to_json(model: &FarmModel) -> serde_json::Result<Value> {
    let table = model.table();
    let mut rows = Vec::with_capacity(table.feature_count() as usize);
    for row in 0..table.feature_count() as usize {
        let mut cells = vec![];
        for (code, spec) in table.present_cells(row) {
            cells.push(json!({ "code": code, "spec": serde_json::to_value(spec)? }));
        }
        rows.push(json!({ "row": row, "cells": cells }));
    }

    let mut features = vec![];
    for (category, feature) in model.features() {
        let mut value = serde_json::to_value(feature)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(String::from("key"), json!(category));
            obj.insert(
                String::from("usageFlags"),
                json!(feature.usage_bitmask.names()),
            );
            let labels: Vec<&str> = model
                .labels_for_category(category)
                .iter()
                .map(|k| k.label.as_str())
                .collect();
            obj.insert(String::from("labels"), json!(labels));
        }
        features.push(value);
    }

    let mut attributes = vec![];
    for (code, attribute) in model.attributes() {
        let mut value = serde_json::to_value(attribute)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(String::from("key"), json!(code));
        }
        attributes.push(value);
    }

    let labels: Vec<Value> = model
        .labels()
        .into_iter()
        .map(|(key, category)| {
            json!({ "label": key.label, "geometry": key.geometry, "category": category })
        })
        .collect();

    let mut doc = Map::new();
    doc.insert(String::from("endianness"), json!(model.byte_order().name()));
    doc.insert(String::from("version"), serde_json::to_value(model.version())?);
    doc.insert(
        String::from("farmTable"),
        json!({
            "featureCount": table.feature_count(),
            "attributeCount": table.attribute_count(),
            "attributeCodes": table.attribute_codes(),
            "rows": rows,
        }),
    );
    doc.insert(String::from("features"), Value::Array(features));
    doc.insert(String::from("attributes"), Value::Array(attributes));
    doc.insert(
        String::from("featureLabelAndGeometryMap"),
        Value::Array(labels),
    );
    Ok(Value::Object(doc))
}

/// Pretty-printed JSON text for a model.
pub fn to_json_string(model: &FarmModel) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_json(model)?)
}

#[cfg(test)]
mod export_tests {
    use super::*;
    use crate::reader::ByteOrder;
    use crate::testdata::avenue_farm;

    #[test]
    fn avenue_document() {
        let model = FarmModel::from_bytes(&avenue_farm(ByteOrder::Big)).unwrap();
        let doc = to_json(&model).unwrap();
        let keys: Vec<&str> = doc.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(
            vec![
                "endianness",
                "version",
                "farmTable",
                "features",
                "attributes",
                "featureLabelAndGeometryMap"
            ],
            keys
        );
        assert_eq!("BIG_ENDIAN", doc["endianness"]);
        assert_eq!(8, doc["version"]["major"]);
        assert_eq!(json!([5]), doc["farmTable"]["attributeCodes"]);

        let cell = &doc["farmTable"]["rows"][0]["cells"][0];
        assert_eq!(5, cell["code"]);
        assert_eq!("BOUNDED_INT", cell["spec"]["dataType"]);
        assert_eq!(100, cell["spec"]["max"]);

        let feature = &doc["features"][0];
        assert_eq!(7, feature["code"]);
        assert_eq!("POINT", feature["geometry"]);
        assert_eq!(json!(["AVENUE"]), feature["usageFlags"]);
        assert_eq!(json!(["AVENUE"]), feature["labels"]);

        let attribute = &doc["attributes"][0];
        assert_eq!("WIDTH", attribute["label"]);
        assert_eq!("INT32", attribute["dataKind"]);
        assert_eq!("METERS", attribute["units"]);
        assert_eq!(true, attribute["editable"]);

        assert_eq!(
            json!([{ "label": "AVENUE", "geometry": "POINT", "category": 0 }]),
            doc["featureLabelAndGeometryMap"]
        );
    }

    #[test]
    fn export_is_deterministic() {
        let data = avenue_farm(ByteOrder::Little);
        let a = to_json_string(&FarmModel::from_bytes(&data).unwrap()).unwrap();
        let b = to_json_string(&FarmModel::from_bytes(&data).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
