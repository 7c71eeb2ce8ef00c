pub mod messages;
pub mod threads;
