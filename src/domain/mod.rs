// Domain layer - Core data model and pure segment rules

pub mod model;
pub mod rules;
