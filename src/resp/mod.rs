pub mod fail;
pub mod jwt;
