//! User rows, roles and the Postgres repository.

pub mod model;
pub mod repo;
