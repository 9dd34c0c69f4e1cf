pub mod account;
pub mod chain;
pub mod client;
pub mod detect;
pub mod exec;
pub mod greeks;
pub mod margin;
pub mod model;
pub mod pricing;
pub mod render;
pub mod risk;

pub mod config;
