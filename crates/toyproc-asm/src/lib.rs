pub mod model;

pub use model::{load_image, save_image, Image};
