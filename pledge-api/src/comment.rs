use crate::{CampaignId, CommentId, Error, Time, UserId};

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Author {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Two-letter fallback shown when there is no avatar
    pub fn initials(&self) -> String {
        let first = self.first_name.chars().next().unwrap_or('U');
        let last = self.last_name.chars().next().unwrap_or('N');
        format!("{first}{last}")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub campaign_id: CampaignId,

    #[serde(rename = "userId")]
    pub author_id: UserId,

    pub content: String,

    /// None for top-level comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    pub is_approved: bool,
    pub created_at: Time,
    pub updated_at: Time,

    /// Number of direct replies according to the server. Can be larger than
    /// `replies.len()` when the replies have not been fetched yet.
    #[serde(default)]
    pub reply_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Author>,

    /// Direct children, only populated once fetched
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_replies(&self) -> bool {
        self.reply_count > 0
    }

    /// True when the server reports replies that are not held locally yet
    pub fn replies_pending(&self) -> bool {
        self.replies.is_empty() && self.reply_count > 0
    }

    pub fn is_authored_by(&self, user: &UserId) -> bool {
        self.author_id == *user
    }
}

/// Payload of create and update responses
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentData {
    pub comment: Comment,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub campaign_id: CampaignId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(self.campaign_id.as_str())?;
        crate::validate_content(&self.content)?;
        if let Some(p) = &self.parent_id {
            crate::validate_string(p.as_str())?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentUpdate {
    pub content: String,
}

impl CommentUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_content(&self.content)?;
        Ok(())
    }
}
