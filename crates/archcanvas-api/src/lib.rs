pub mod error;
pub mod extract;
pub mod health;
pub mod rest;
pub mod routes;
pub mod server;
pub mod state;

pub use error::*;
pub use extract::{ApiJson, ApiQuery};
pub use rest::ApiDoc;
pub use routes::*;
pub use server::*;
pub use state::*;
