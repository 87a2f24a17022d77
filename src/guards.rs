pub mod admin_guard;
pub mod limit_guard;
pub mod token_guard;
