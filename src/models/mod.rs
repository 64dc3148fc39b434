pub mod accommodations;
pub mod activities;
pub mod lbws;
pub mod messages;
pub mod registrations;
pub mod users;

pub use accommodations::AccommodationRow;
pub use activities::ActivityRow;
pub use lbws::LbwRow;
pub use messages::MessageRow;
pub use registrations::{ParticipantRow, RegistrationRow};
pub use users::UserRow;
