mod extractors;
pub mod handlers;
pub mod openapi;
mod routes;
mod state;

pub use extractors::ImageUpload;
pub use routes::create_router;
pub use state::AppState;
