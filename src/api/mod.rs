pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, start_api_server};
pub use state::ApiState;
