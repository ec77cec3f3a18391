//! In-memory chat history for one client session.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub image: Option<Vec<u8>>,
}

impl Message {
    pub fn has_image(&self) -> bool {
        self.image.as_ref().is_some_and(|img| !img.is_empty())
    }
}

/// One plot from the history, with the question that led to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotEntry<'a> {
    pub question: Option<&'a str>,
    pub answer: &'a str,
    pub image: &'a [u8],
}

/// Append-only transcript; only [`Session::clear`] removes messages.
#[derive(Debug, Default)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into(), None);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, image: Option<Vec<u8>>) {
        self.push(Role::Assistant, content.into(), image);
    }

    fn push(&mut self, role: Role, content: String, image: Option<Vec<u8>>) {
        self.messages.push(Message {
            role,
            content,
            image,
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Assistant messages carrying an image, each paired with the nearest
    /// preceding user message.
    pub fn plots(&self) -> Vec<PlotEntry<'_>> {
        let mut last_question = None;
        let mut entries = Vec::new();
        for msg in &self.messages {
            match msg.role {
                Role::User => last_question = Some(msg.content.as_str()),
                Role::Assistant => {
                    if let Some(image) = msg.image.as_deref().filter(|img| !img.is_empty()) {
                        entries.push(PlotEntry {
                            question: last_question,
                            answer: &msg.content,
                            image,
                        });
                    }
                }
            }
        }
        entries
    }
}
