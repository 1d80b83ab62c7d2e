pub mod health;
pub mod interview;
pub mod question;
pub mod user;
