use chrono::Utc;

pub type Time = chrono::DateTime<Utc>;

mod comment;
pub use comment::{Author, Comment, CommentData, CommentUpdate, NewComment};

mod error;
pub use error::Error;

mod id;
pub use id::{AuthToken, CampaignId, CommentId, UserId};

mod page;
pub use page::{ApiResponse, CommentPage, PageRequest, Pagination, ReplyPage};

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

/// Checks user-typed comment text, returning the trimmed content that should be
/// sent to the server
pub fn validate_content(s: &str) -> Result<&str, Error> {
    validate_string(s)?;
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::EmptyContent);
    }
    Ok(s)
}
