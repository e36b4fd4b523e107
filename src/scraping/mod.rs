pub mod connect;
mod dom;
pub mod models;
pub mod navigator;
pub mod profile;
pub mod search;
pub mod text;

pub use connect::ConnectionRequester;
pub use navigator::{with_session_retry, PageNavigator};
pub use profile::ProfileExtractor;
pub use search::{SearchWalker, WalkReport};
