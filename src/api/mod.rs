pub mod health;
pub mod routes;

pub use health::HealthState;
