pub mod error;
pub mod geo;
pub mod pagination;
pub mod response;
pub mod validation;
