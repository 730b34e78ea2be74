use crate::types::Sender;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

/// A rendered node in the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub sender: Sender,
    pub text: String,
    pub typing: bool,
}

impl Entry {
    pub fn class_name(&self) -> String {
        let mut class = format!("message {}", self.sender.class_name());
        if self.typing {
            class.push_str(" typing-indicator");
        }
        class
    }
}

pub trait MessageView: Send {
    /// Appends at the end of the list and returns the new node's id.
    fn append(&mut self, sender: Sender, text: &str, typing: bool) -> EntryId;
    /// Drops a node; unknown ids are ignored.
    fn remove(&mut self, id: EntryId);
    fn scroll_to_latest(&mut self);
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    next_id: u64,
    scrolled_to: Option<EntryId>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn by_sender(&self, sender: Sender) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |entry| entry.sender == sender && !entry.typing)
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn scrolled_to(&self) -> Option<EntryId> {
        self.scrolled_to
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MessageView for Transcript {
    fn append(&mut self, sender: Sender, text: &str, typing: bool) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            sender,
            text: text.to_string(),
            typing,
        });
        id
    }

    fn remove(&mut self, id: EntryId) {
        self.entries.retain(|entry| entry.id != id);
        if self.scrolled_to == Some(id) {
            self.scrolled_to = self.entries.last().map(|entry| entry.id);
        }
    }

    fn scroll_to_latest(&mut self) {
        self.scrolled_to = self.entries.last().map(|entry| entry.id);
    }
}

/// Prints each appended entry as a line. Output cannot be retracted, so a
/// removed entry only disappears from the backing transcript.
pub struct TerminalView<W> {
    out: W,
    transcript: Transcript,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            transcript: Transcript::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> MessageView for TerminalView<W> {
    fn append(&mut self, sender: Sender, text: &str, typing: bool) -> EntryId {
        let marker = match sender {
            Sender::User => ">",
            Sender::Bot => "<",
        };
        if let Err(err) = writeln!(self.out, "{marker} {text}") {
            log::warn!("failed to write message to terminal: {err}");
        }
        self.transcript.append(sender, text, typing)
    }

    fn remove(&mut self, id: EntryId) {
        self.transcript.remove(id);
    }

    fn scroll_to_latest(&mut self) {
        self.transcript.scroll_to_latest();
        if let Err(err) = self.out.flush() {
            log::warn!("failed to flush terminal: {err}");
        }
    }
}
