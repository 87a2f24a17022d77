pub mod admin;
pub mod auth;
pub mod comments;
pub mod notifications;
pub mod posts;
pub mod repos;
pub mod root;
pub mod trending;
pub mod users;
