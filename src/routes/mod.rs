pub mod account;
pub mod admin;
pub mod applications;
pub mod auth;
pub mod bookings;
pub mod discovery;
pub mod health;
pub mod organiser;
