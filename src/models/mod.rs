mod application;
mod gateway_event;
mod landlord;
mod screening_event;
mod screening_order;
mod verified_queue;

pub use application::{
    ApplicationStatus, ConsentPayload, CreateApplication, RentalApplication, ScreeningStatus,
};
pub use gateway_event::GatewayEvent;
pub use landlord::{CreateLandlord, Landlord};
pub use screening_event::{ScreeningEvent, ScreeningEventType};
pub use screening_order::{CreateScreeningOrder, ScreeningOrder, ServiceLevel};
pub use verified_queue::QueueEntry;
