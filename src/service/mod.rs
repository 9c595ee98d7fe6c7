pub mod pricing;
pub mod quote_lifecycle;
pub mod quote_service;
