pub mod audit;
pub mod cursor;
pub mod identity;
pub mod mailer;
pub mod roles;
pub mod safe_redirect;
