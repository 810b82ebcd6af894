//! Helper functions for templates and routes

mod date;
mod routes;

pub use self::date::*;
pub use self::routes::*;
