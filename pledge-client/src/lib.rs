mod config;
pub use config::ClientConfig;

mod error;
pub use error::Error;

mod form;
pub use form::{Composer, FormState};

mod http;
pub use http::HttpService;

mod notice;
pub use notice::{Notice, NoticeKind, Notices};

pub mod recent;
pub use recent::RecentSearches;

mod render;
pub use render::{Row, Snapshot, MAX_INDENT};

mod service;
pub use service::CommentService;

pub mod tree;

mod view;
pub use view::{CommentView, Toggle};

pub mod api {
    pub use pledge_api::*;
}
