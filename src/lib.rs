pub mod api;
pub mod app;
pub mod app_state;
pub mod config;
pub mod database;
pub mod errors;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;
