pub mod change;
pub mod cost;
pub mod coverage;
pub mod gen;
pub mod impact;
pub mod init;
pub mod plan;
pub mod validate;
