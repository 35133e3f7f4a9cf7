pub mod fill;
pub mod scripting;
pub mod stroke;
pub mod text;
