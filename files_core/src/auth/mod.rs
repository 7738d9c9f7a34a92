pub mod models;
pub mod repository;
pub mod service;
pub mod session;


pub use models::*;
pub use repository::*;
pub use service::*;
pub use session::*;
