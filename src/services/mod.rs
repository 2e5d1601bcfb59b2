pub mod assignment;
pub mod auth;
pub mod calendar;
pub mod date_key;
pub mod init;
pub mod shift_types;
pub mod summary;
