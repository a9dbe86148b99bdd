pub mod transformer;

pub use transformer::{transform_data, Transformer};
