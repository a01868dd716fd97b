#![forbid(unsafe_code)]

pub mod access;
pub mod identity;
pub mod income;
pub mod risk;
