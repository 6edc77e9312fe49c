mod common;
pub use self::common::{Query, QueryCommon};

mod posts;
pub use self::posts::{PostsOrder, PostsQuery};
