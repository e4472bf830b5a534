//! SeaORM entity definitions for the chronicle database schema.

pub mod commit;
pub mod prelude;
pub mod repository;
