pub mod approval;
pub mod login;
pub mod magic_link;
pub mod otp;
pub mod password_reset;
pub mod registration;
