pub mod action_queue;
pub mod audit_queue;
