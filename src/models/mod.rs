pub mod booking;
pub mod chat;
pub mod event;
pub mod service;
pub mod shop_hours;
pub mod slot;
pub mod user;
pub mod vehicle;

pub use booking::{ApprovalStatus, Booking, WorkStatus};
pub use chat::ChatMessage;
pub use event::{BookingEvent, BookingEventKind};
pub use service::Service;
pub use shop_hours::ShopHours;
pub use slot::{Interval, Slot};
pub use user::{Caller, Role, User};
pub use vehicle::{Vehicle, VehicleSpec};
