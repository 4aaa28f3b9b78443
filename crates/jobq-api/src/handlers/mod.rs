pub mod health;
pub mod saved;
pub mod search;
