pub mod cache;
pub mod captcha;
pub mod db;
pub mod gateway;
pub mod notify;
