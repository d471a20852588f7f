//! Descriptors for the sample types

use serde_json::{json, Map};

use core_kernel::registry::EntityRegistryBuilder;
use core_kernel::{
    CoreError, EntityDescriptor, EntityRegistry, FieldDescriptor, FieldKind, InputType,
    NavigationDescriptor,
};

pub const COUNTRY: &str = "Country";
pub const CITY: &str = "City";
pub const LEADER: &str = "Leader";
pub const AIRLINE: &str = "Airline";
pub const AIRLINE_COUNTRY: &str = "AirlineCountry";

/// Builds the registry holding every sample type
///
/// # Errors
///
/// `CoreError::Configuration` if the registrations are inconsistent
pub fn registry() -> Result<EntityRegistry, CoreError> {
    register(EntityRegistry::builder())?.build()
}

/// Adds the sample types to an existing registry builder
pub fn register(builder: EntityRegistryBuilder) -> Result<EntityRegistryBuilder, CoreError> {
    Ok(builder.register_all([
        country()?,
        city()?,
        leader()?,
        airline()?,
        airline_country()?,
    ]))
}

pub fn country() -> Result<EntityDescriptor, CoreError> {
    EntityDescriptor::builder(COUNTRY)
        .field(
            FieldDescriptor::new("name", FieldKind::Text)
                .required()
                .max_length(100)
                .default_value(""),
        )
        .field(
            FieldDescriptor::new("epiIndex", FieldKind::Decimal)
                .label("EPI Index")
                .input_type(InputType::Range)
                .range(0.0, 100.0)
                .group("Statistics"),
        )
        .field(FieldDescriptor::new("independenceDay", FieldKind::Date).group("Statistics"))
        .field(
            FieldDescriptor::new("description", FieldKind::Text)
                .input_type(InputType::TextArea)
                .max_length(2000),
        )
        .navigation(NavigationDescriptor::collection("cities", CITY, "country"))
        .navigation(NavigationDescriptor::dependent("leader", LEADER, "country"))
        .navigation(
            NavigationDescriptor::many_to_many(
                "airlines",
                AIRLINE,
                AIRLINE_COUNTRY,
                "countryId",
                "airlineId",
            )
            .inverse("countries"),
        )
        .build()
}

pub fn city() -> Result<EntityDescriptor, CoreError> {
    EntityDescriptor::builder(CITY)
        .field(
            FieldDescriptor::new("name", FieldKind::Text)
                .required()
                .max_length(100)
                .default_value(""),
        )
        .field(FieldDescriptor::new("population", FieldKind::Integer).range(0.0, 1.0e10))
        .field(FieldDescriptor::new("isCapital", FieldKind::Boolean).default_value(false))
        .navigation(
            NavigationDescriptor::reference("country", COUNTRY, "countryId")
                .required()
                .inverse("cities"),
        )
        .build()
}

pub fn leader() -> Result<EntityDescriptor, CoreError> {
    EntityDescriptor::builder(LEADER)
        .field(
            FieldDescriptor::new("name", FieldKind::Text)
                .max_length(100)
                .default_value(""),
        )
        .field(FieldDescriptor::new("title", FieldKind::Text).max_length(50))
        .field(FieldDescriptor::new("termStart", FieldKind::Date))
        .navigation(NavigationDescriptor::reference("country", COUNTRY, "countryId").inverse("leader"))
        .navigation(NavigationDescriptor::reference("hometown", CITY, "hometownId"))
        .factory(|| {
            let mut record = Map::new();
            record.insert("title".to_string(), json!("Prime Minister"));
            record
        })
        .build()
}

pub fn airline() -> Result<EntityDescriptor, CoreError> {
    EntityDescriptor::builder(AIRLINE)
        .field(
            FieldDescriptor::new("name", FieldKind::Text)
                .required()
                .max_length(100)
                .default_value(""),
        )
        .field(
            FieldDescriptor::new("iataCode", FieldKind::Text)
                .label("IATA Code")
                .max_length(2),
        )
        .field(FieldDescriptor::new("founded", FieldKind::Integer))
        .navigation(
            NavigationDescriptor::many_to_many(
                "countries",
                COUNTRY,
                AIRLINE_COUNTRY,
                "airlineId",
                "countryId",
            )
            .inverse("airlines"),
        )
        .build()
}

/// Join records linking airlines and countries
pub fn airline_country() -> Result<EntityDescriptor, CoreError> {
    EntityDescriptor::builder(AIRLINE_COUNTRY)
        .field(FieldDescriptor::new("since", FieldKind::Date))
        .navigation(NavigationDescriptor::reference("airline", AIRLINE, "airlineId").required())
        .navigation(NavigationDescriptor::reference("country", COUNTRY, "countryId").required())
        .build()
}
