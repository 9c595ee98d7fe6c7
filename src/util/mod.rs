pub mod clock;
pub mod error;
pub mod logger;
pub mod quote_number;
pub mod timestamp;
