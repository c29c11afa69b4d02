pub mod event;
pub mod hub;
