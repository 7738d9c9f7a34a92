pub mod json;

pub use json::{lenient_bool, lenient_string, LenientJson};
