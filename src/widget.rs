//! The chat widget controller.
//!
//! Every submitted turn renders the user's line at once and then runs its
//! request in a spawned task of its own. Turns are not coordinated: replies
//! land in the view in the order their requests resolve.

use crate::config::{Variant, WidgetSettings};
use crate::identity::IdentityProvider;
use crate::transport::{ChatBackend, TransportError};
use crate::types::{ChatRequest, Message, Sender};
use crate::view::{EntryId, MessageView};
use anyhow::{bail, Result};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

pub type SharedView = Arc<Mutex<dyn MessageView>>;

const TYPING_TEXT: &str = "Typing...";
const STATUS_ERROR_TEXT: &str = "Error: Could not get response from server";
const SUBMIT_KEY: &str = "Enter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The send button.
    Click,
    KeyPress(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputField {
    value: String,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Render the failure as a bot message.
    Inline,
    /// Only log it; the view is left as it was.
    LogOnly,
}

impl FailurePolicy {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Direct => FailurePolicy::Inline,
            Variant::Relay => FailurePolicy::LogOnly,
        }
    }
}

#[derive(Clone)]
struct Renderer {
    view: SharedView,
    show_timestamps: bool,
}

impl Renderer {
    fn render(&self, message: &Message) {
        let text = if self.show_timestamps {
            format!(
                "[{}] {}: {}",
                message.timestamp,
                message.sender.label(),
                message.text
            )
        } else {
            message.text.clone()
        };
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        view.append(message.sender, &text, false);
        view.scroll_to_latest();
    }

    fn show_typing(&self) -> EntryId {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        let id = view.append(Sender::Bot, TYPING_TEXT, true);
        view.scroll_to_latest();
        id
    }

    fn remove(&self, id: EntryId) {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        view.remove(id);
    }

    fn report(
        &self,
        policy: FailurePolicy,
        err: &dyn fmt::Display,
        inline_text: String,
        typing: Option<EntryId>,
    ) {
        match policy {
            FailurePolicy::Inline => {
                if let Some(id) = typing {
                    self.remove(id);
                }
                self.render(&Message::bot(inline_text));
            }
            // The typing indicator stays up on this path.
            FailurePolicy::LogOnly => log::error!("chat turn failed: {err}"),
        }
    }
}

pub struct ChatWidget {
    settings: WidgetSettings,
    renderer: Renderer,
    backend: Arc<dyn ChatBackend>,
    identity: Option<Arc<dyn IdentityProvider>>,
    policy: FailurePolicy,
}

impl ChatWidget {
    pub fn new(
        settings: WidgetSettings,
        view: SharedView,
        backend: Arc<dyn ChatBackend>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Result<Self> {
        if settings.variant == Variant::Relay && identity.is_none() {
            bail!("relay variant requires a conversation identity provider");
        }
        let policy = FailurePolicy::for_variant(settings.variant);
        let renderer = Renderer {
            view,
            show_timestamps: settings.show_timestamps,
        };
        Ok(Self {
            settings,
            renderer,
            backend,
            identity,
            policy,
        })
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    /// Shows the greeting. Call once, before feeding any events.
    pub fn mount(&self) {
        self.render(&Message::bot(self.settings.welcome.clone()));
    }

    /// Routes a control event. Only the send button and the Enter key submit.
    pub fn dispatch(&self, event: UiEvent, field: &mut InputField) -> Option<JoinHandle<()>> {
        match event {
            UiEvent::Click => self.submit(field),
            UiEvent::KeyPress(key) if key == SUBMIT_KEY => self.submit(field),
            UiEvent::KeyPress(_) => None,
        }
    }

    pub fn render(&self, message: &Message) {
        self.renderer.render(message);
    }

    /// Starts one turn from the field's trimmed contents. Returns the
    /// in-flight request, or `None` when nothing was sent.
    pub fn submit(&self, field: &mut InputField) -> Option<JoinHandle<()>> {
        let text = field.value().trim().to_string();
        if text.is_empty() {
            log::debug!("ignoring empty submission");
            return None;
        }

        self.render(&Message::user(text.clone()));
        field.clear();

        let request = match self.build_request(text) {
            Ok(request) => request,
            Err(err) => {
                self.renderer
                    .report(self.policy, &err, format!("Error: {err:#}"), None);
                return None;
            }
        };

        let typing = self
            .settings
            .typing_indicator
            .then(|| self.renderer.show_typing());

        let renderer = self.renderer.clone();
        let backend = Arc::clone(&self.backend);
        let policy = self.policy;
        Some(tokio::spawn(async move {
            match backend.send(&request).await {
                Ok(reply) => {
                    if let Some(id) = typing {
                        renderer.remove(id);
                    }
                    renderer.render(&Message::bot(reply.response));
                }
                Err(err) => renderer.report(policy, &err, failure_text(&err), typing),
            }
        }))
    }

    fn build_request(&self, text: String) -> Result<ChatRequest> {
        match (self.settings.variant, &self.identity) {
            (Variant::Relay, Some(identity)) => {
                let hash = identity.get_or_create()?;
                Ok(ChatRequest::relay(hash, text))
            }
            (Variant::Relay, None) => bail!("no conversation identity provider"),
            (Variant::Direct, _) => Ok(ChatRequest::direct(text)),
        }
    }
}

fn failure_text(err: &TransportError) -> String {
    match err {
        TransportError::Status(_) => STATUS_ERROR_TEXT.to_string(),
        other => format!("Error: {other}"),
    }
}
