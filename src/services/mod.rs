pub mod favorites;
pub mod notifications;
