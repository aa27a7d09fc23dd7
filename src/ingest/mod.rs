pub mod api;
pub mod server;

pub use api::IngestState;
pub use server::{router, serve, start_server};
