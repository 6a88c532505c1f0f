use futures::channel::mpsc;

pub type Notices = mpsc::UnboundedReceiver<Notice>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient message for the user, eg. a toast
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: &'static str,
    pub description: String,
}

impl Notice {
    pub fn success(title: &'static str, description: impl Into<String>) -> Notice {
        Notice {
            kind: NoticeKind::Success,
            title,
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Notice {
        Notice {
            kind: NoticeKind::Error,
            title: "Error",
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}
