pub mod booking_repo;
pub mod directory_repo;
pub mod mongo_client;
pub mod quote_repo;
pub mod repository_error;
