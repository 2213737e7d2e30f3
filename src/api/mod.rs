pub mod auth;
pub mod bills;
pub mod cards;
pub mod context;
pub mod docs;
pub mod health;
pub mod middleware;
pub mod users;
pub mod validation;
