pub mod matrix;

pub use matrix::MatrixStack;
