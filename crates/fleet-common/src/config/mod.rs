mod application;

pub use application::{AppConfig, DispatchConfig, FleetConfig};
