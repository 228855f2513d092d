pub mod access;
pub mod seed;
pub mod token;
