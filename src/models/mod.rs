pub mod event;
pub mod fcm;
pub mod health;
pub mod notification;
pub mod pagination;
pub mod response;
pub mod retry;
