//! Sample Data Types
//!
//! The data types the demo server serves and the test suites exercise. They
//! cover every relationship the repository supports:
//!
//! - **Country** owns a collection of cities, one leader and a many-to-many
//!   set of airlines
//! - **City** requires its country; removing the country removes its cities
//! - **Leader** optionally belongs to one country (one-to-one) and may name
//!   a hometown city
//! - **Airline** links to countries through **AirlineCountry** records
//!
//! # Examples
//!
//! ```rust
//! let registry = domain_sample::registry().unwrap();
//! assert!(registry.contains("Country"));
//! assert!(registry.is_join_type("AirlineCountry"));
//! ```

pub mod entities;
pub mod seed;

pub use entities::{
    airline, airline_country, city, country, leader, register, registry, AIRLINE,
    AIRLINE_COUNTRY, CITY, COUNTRY, LEADER,
};
pub use seed::sample_items;
