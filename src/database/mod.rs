pub mod connector;
pub mod models;
pub mod schema;
pub mod types;

pub use connector::{DB, connect_lazy, connect_with_settings, ping};
