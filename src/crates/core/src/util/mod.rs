pub mod errors;

pub use errors::{MathMateError, MathMateResult};
