pub mod result;
pub mod symbol;
