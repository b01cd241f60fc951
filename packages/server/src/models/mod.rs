pub mod auth;
pub mod home;
pub mod sample;
pub mod shared;
pub mod source;
pub mod tag;
pub mod user;
pub mod wiki;
