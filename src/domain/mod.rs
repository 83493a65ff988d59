//! Store domain: aggregates, value objects, events, pricing and analytics.
pub mod aggregates;
pub mod analytics;
pub mod events;
pub mod pricing;
pub mod value_objects;
