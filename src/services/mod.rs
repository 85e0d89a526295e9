pub mod admission;
pub mod calendar;
pub mod chat;
pub mod events;
pub mod slots;
pub mod workflow;
