//! Demo records for the sample types

use serde_json::{json, Map, Value};
use tracing::debug;

use core_kernel::{DataItem, ItemId};

use crate::entities::{AIRLINE, AIRLINE_COUNTRY, CITY, COUNTRY, LEADER};

fn record(data_type: &str, values: Value) -> DataItem {
    let fields = match values {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    DataItem::new(data_type, ItemId::new_v7(), fields)
}

fn city(name: &str, population: i64, is_capital: bool, country: ItemId) -> DataItem {
    record(
        CITY,
        json!({
            "name": name,
            "population": population,
            "isCapital": is_capital,
            "countryId": country.to_json(),
        }),
    )
}

fn link(airline: ItemId, country: ItemId, since: &str) -> DataItem {
    record(
        AIRLINE_COUNTRY,
        json!({ "airlineId": airline.to_json(), "countryId": country.to_json(), "since": since }),
    )
}

/// A small, connected data set: three countries with cities, two leaders
/// and two airlines serving several countries
pub fn sample_items() -> Vec<DataItem> {
    let norway = record(
        COUNTRY,
        json!({ "name": "Norway", "epiIndex": 77.7, "independenceDay": "1905-06-07", "description": null }),
    );
    let sweden = record(
        COUNTRY,
        json!({ "name": "Sweden", "epiIndex": 72.7, "independenceDay": "1523-06-06", "description": null }),
    );
    let denmark = record(
        COUNTRY,
        json!({ "name": "Denmark", "epiIndex": 77.9, "independenceDay": null, "description": null }),
    );

    let oslo = city("Oslo", 709_037, true, norway.id);
    let bergen = city("Bergen", 286_930, false, norway.id);
    let stockholm = city("Stockholm", 984_748, true, sweden.id);
    let copenhagen = city("Copenhagen", 653_664, true, denmark.id);

    let norway_leader = record(
        LEADER,
        json!({
            "name": "Jonas Gahr Støre",
            "title": "Prime Minister",
            "termStart": "2021-10-14",
            "countryId": norway.id.to_json(),
            "hometownId": oslo.id.to_json(),
        }),
    );
    let sweden_leader = record(
        LEADER,
        json!({
            "name": "Ulf Kristersson",
            "title": "Prime Minister",
            "termStart": "2022-10-18",
            "countryId": sweden.id.to_json(),
            "hometownId": null,
        }),
    );

    let sas = record(AIRLINE, json!({ "name": "Scandinavian Airlines", "iataCode": "SK", "founded": 1946 }));
    let norwegian = record(AIRLINE, json!({ "name": "Norwegian", "iataCode": "DY", "founded": 1993 }));

    let links = vec![
        link(sas.id, norway.id, "1946-08-01"),
        link(sas.id, sweden.id, "1946-08-01"),
        link(sas.id, denmark.id, "1946-08-01"),
        link(norwegian.id, norway.id, "2002-09-01"),
    ];

    let mut items = vec![
        norway,
        sweden,
        denmark,
        oslo,
        bergen,
        stockholm,
        copenhagen,
        norway_leader,
        sweden_leader,
        sas,
        norwegian,
    ];
    items.extend(links);
    debug!(count = items.len(), "Built sample records");
    items
}
