mod meta;
pub use self::meta::{Connection, Edge, GraphQlError, GraphQlResponse, PageInfo, PostsData};

mod post;
pub use self::post::{Maker, Media, Post, Thumbnail, Topic};

mod auth;
pub use self::auth::TokenResponse;
