pub mod crypto;
pub mod duration;
pub mod retry;
pub mod token;
