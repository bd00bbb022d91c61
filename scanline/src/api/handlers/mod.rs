pub(crate) mod health;
pub mod ocr;

pub use health::health_check;
pub use ocr::recognize;
