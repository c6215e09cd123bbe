pub mod launch;
pub mod notify;
pub mod open;
