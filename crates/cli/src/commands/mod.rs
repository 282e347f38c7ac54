pub mod chat;
pub mod gateway;
pub mod onboard;
