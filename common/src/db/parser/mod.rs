pub mod events;
pub mod layout;
