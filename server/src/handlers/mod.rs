pub mod admin;
pub mod auth;
pub mod booking;
pub mod brand;
pub mod dashboard;
pub mod event;
pub mod health;
pub mod notification;
pub mod ticket;
pub mod upload;
pub mod venue;
pub mod whatsapp;

pub use health::health_check;
