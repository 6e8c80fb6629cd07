//! Port traits for the collaborators around the risk pipeline.

pub mod config_port;
pub mod data_port;
pub mod forecast_port;
