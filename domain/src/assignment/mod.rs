//! Group assignment: configuration and the partitioning engine.

pub mod config;
pub mod engine;

pub use config::{FivePersonChoice, GroupConfiguration, GroupRotation, GroupSize, ObserverStrategy};
pub use engine::{
    ValidationReport, assign, balance_roles, fill_open_seats, group_sizes, is_partition,
    seat_group, shuffle_groups, validate_configuration,
};
