mod client;
mod errors;
mod query;
pub mod types;
pub mod user_agent;
pub use self::client::{Client, Credentials};
pub use self::errors::Error;
pub use self::query::{PostsOrder, PostsQuery, Query};
