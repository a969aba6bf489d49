pub mod backend;
pub mod fcm;
pub mod health;
pub mod popup;
pub mod redis;
pub mod storage;
