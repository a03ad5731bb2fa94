pub mod kernel;
pub mod linear;
