#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum FormState {
    #[default]
    Idle,
    Submitting,
    /// Idle again, with the message of the last failed submission
    Failed(String),
}

/// A comment input widget: its draft and where its submission stands
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Composer {
    pub draft: String,
    pub state: FormState,
}

impl Composer {
    pub fn with_draft(draft: impl Into<String>) -> Composer {
        Composer {
            draft: draft.into(),
            state: FormState::Idle,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.state == FormState::Submitting
    }

    /// Whether the submit button is enabled
    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && !self.draft.trim().is_empty()
    }

    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            FormState::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    /// Moves to `Submitting`, returning the trimmed draft to send
    pub(crate) fn begin(&mut self) -> Result<String, crate::Error> {
        if self.is_submitting() {
            return Err(crate::Error::Disabled("a submission is already in flight"));
        }
        let content = self.draft.trim();
        if content.is_empty() {
            return Err(crate::Error::Disabled("comment is empty"));
        }
        let content = String::from(content);
        self.state = FormState::Submitting;
        Ok(content)
    }

    pub(crate) fn succeed(&mut self) {
        self.draft.clear();
        self.state = FormState::Idle;
    }

    /// The draft stays so the user can retry
    pub(crate) fn fail(&mut self, msg: String) {
        self.state = FormState::Failed(msg);
    }
}
