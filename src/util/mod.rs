pub mod bbox;
pub mod matrix;
