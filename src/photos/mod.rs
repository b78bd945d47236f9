pub mod handlers;
pub mod storage;

pub use handlers::router;
pub use storage::{PhotoStore, S3PhotoStore};
