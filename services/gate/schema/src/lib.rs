pub mod approval_decisions;
pub mod approval_tokens;
pub mod login_events;
pub mod magic_links;
pub mod verification_codes;
