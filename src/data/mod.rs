pub mod index;
pub mod meili;
pub mod migrations;
pub mod repository;
pub mod sqlite;
