mod helpers;

mod approval_test;
mod password_reset_test;
