//! Built-in enforcement filters.

pub mod external_service;
pub mod max_reservation_length;

pub use external_service::{EnvToken, ExternalServiceFilter, StaticToken, TokenSource};
pub use max_reservation_length::MaxReservationLengthFilter;
