pub mod health;
pub mod respond;
pub mod schedules;
