pub mod config_validation;
pub mod drawdown;
pub mod error;
pub mod forecast;
pub mod pipeline;
pub mod portfolio;
pub mod score;
pub mod series;
pub mod strategy;
pub mod table;
