pub mod auth_service;
pub mod booking_service;
pub mod brand_service;
pub mod checkin;
pub mod dashboard_service;
pub mod event_service;
pub mod notification_service;
pub mod payout_service;
pub mod ticket_service;
pub mod upload_service;
pub mod venue_service;
pub mod whatsapp_service;
