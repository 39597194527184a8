//! Async driver for the session machine.
//!
//! The controller owns the [`SessionMachine`], feeds it UI commands and
//! internal events, carries out the effects it returns and publishes a fresh
//! [`SessionSnapshot`] whenever something visible changed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use solarops_config::AssistantConfig;
use solarops_core::{encode_outbound, AssistantError, CredentialProvider, SiteId};
use solarops_logging::redact_sensitive_data;

use crate::session::{Effect, Event, SessionMachine};
use crate::snapshot::SessionSnapshot;
use crate::transport::{transport_url, Connector, TransportHandle, TransportSink};

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub chat_endpoint: String,
    pub response_block_delay: Duration,
}

impl ControllerSettings {
    /// The chat endpoint must already form a valid socket URL; checked with a
    /// placeholder token.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let chat_endpoint = config.chat_endpoint().to_string();
        transport_url(&chat_endpoint, "-").map_err(|e| {
            AssistantError::Config(format!("chatEndpoint {chat_endpoint:?}: {e}"))
        })?;
        Ok(Self {
            chat_endpoint,
            response_block_delay: config.response_block_delay(),
        })
    }
}

/// Requests from the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    OpenChat,
    CollapseChat,
    RequestReset,
    RequestClose,
    SetDraft(String),
    Submit(String),
    Navigate { from: String, to: String },
    Confirm,
    Cancel,
    Shutdown,
}

impl UiCommand {
    fn into_event(self) -> Option<Event> {
        let event = match self {
            UiCommand::OpenChat => Event::OpenChat,
            UiCommand::CollapseChat => Event::CollapseChat,
            UiCommand::RequestReset => Event::RequestReset,
            UiCommand::RequestClose => Event::RequestClose,
            UiCommand::SetDraft(text) => Event::SetDraft(text),
            UiCommand::Submit(text) => Event::Submit(text),
            UiCommand::Navigate { from, to } => Event::Navigate { from, to },
            UiCommand::Confirm => Event::Confirm,
            UiCommand::Cancel => Event::Cancel,
            UiCommand::Shutdown => return None,
        };
        Some(event)
    }
}

/// Cheap, cloneable front door to a running controller.
#[derive(Debug, Clone)]
pub struct AssistantHandle {
    commands: mpsc::Sender<UiCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl AssistantHandle {
    async fn send(&self, command: UiCommand) -> Result<(), AssistantError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AssistantError::ControllerStopped)
    }

    pub async fn open_chat(&self) -> Result<(), AssistantError> {
        self.send(UiCommand::OpenChat).await
    }

    pub async fn collapse_chat(&self) -> Result<(), AssistantError> {
        self.send(UiCommand::CollapseChat).await
    }

    pub async fn request_reset(&self) -> Result<(), AssistantError> {
        self.send(UiCommand::RequestReset).await
    }

    pub async fn request_close(&self) -> Result<(), AssistantError> {
        self.send(UiCommand::RequestClose).await
    }

    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), AssistantError> {
        self.send(UiCommand::SetDraft(text.into())).await
    }

    pub async fn submit(&self, text: impl Into<String>) -> Result<(), AssistantError> {
        self.send(UiCommand::Submit(text.into())).await
    }

    /// Ask to move from `from` to `to`. Approved moves come out of the
    /// navigation receiver returned by [`AssistantController::new`].
    pub async fn navigate(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<(), AssistantError> {
        self.send(UiCommand::Navigate {
            from: from.into(),
            to: to.into(),
        })
        .await
    }

    pub async fn confirm(&self) -> Result<(), AssistantError> {
        self.send(UiCommand::Confirm).await
    }

    pub async fn cancel(&self) -> Result<(), AssistantError> {
        self.send(UiCommand::Cancel).await
    }

    pub async fn shutdown(&self) -> Result<(), AssistantError> {
        self.send(UiCommand::Shutdown).await
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }
}

pub struct AssistantController<P, C> {
    machine: SessionMachine,
    provider: Arc<P>,
    connector: C,
    settings: ControllerSettings,
    commands: mpsc::Receiver<UiCommand>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    snapshots: watch::Sender<SessionSnapshot>,
    navigations: mpsc::UnboundedSender<String>,
    transport: Option<TransportHandle>,
}

impl<P, C> AssistantController<P, C>
where
    P: CredentialProvider,
    C: Connector,
{
    /// Build a controller for one site. Returns the controller (to be
    /// [`run`](Self::run)), a handle for the UI and the stream of approved
    /// navigations.
    pub fn new(
        site_id: SiteId,
        provider: P,
        connector: C,
        settings: ControllerSettings,
    ) -> (Self, AssistantHandle, mpsc::UnboundedReceiver<String>) {
        let machine = SessionMachine::new(site_id);
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(machine.snapshot());
        let (navigations, navigations_rx) = mpsc::unbounded_channel();

        let controller = Self {
            machine,
            provider: Arc::new(provider),
            connector,
            settings,
            commands,
            events_tx,
            events_rx,
            snapshots,
            navigations,
            transport: None,
        };
        let handle = AssistantHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (controller, handle, navigations_rx)
    }

    /// Spawn the controller onto the runtime.
    pub fn spawn(
        site_id: SiteId,
        provider: P,
        connector: C,
        settings: ControllerSettings,
    ) -> (AssistantHandle, mpsc::UnboundedReceiver<String>, JoinHandle<()>) {
        let (controller, handle, navigations) = Self::new(site_id, provider, connector, settings);
        let task = tokio::spawn(controller.run());
        (handle, navigations, task)
    }

    /// Process commands and events until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!(site_id = %self.machine.site_id(), "Assistant controller started");
        loop {
            let event = tokio::select! {
                command = self.commands.recv() => match command.and_then(UiCommand::into_event) {
                    Some(event) => event,
                    None => break,
                },
                Some(event) = self.events_rx.recv() => event,
            };
            self.handle(event);
        }

        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        info!(site_id = %self.machine.site_id(), "Assistant controller stopped");
    }

    fn handle(&mut self, event: Event) {
        for effect in self.machine.dispatch(event) {
            self.execute(effect);
        }
        let next = self.machine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::IssueCredential { epoch, site_id } => {
                let provider = Arc::clone(&self.provider);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let event = match provider.issue_session(site_id).await {
                        Ok(credential) => Event::CredentialIssued { epoch, credential },
                        Err(e) => {
                            let error = redact_sensitive_data(&e.to_string());
                            warn!(%site_id, %error, "Credential issuance failed");
                            Event::CredentialFailed { epoch, error }
                        }
                    };
                    let _ = tx.send(event);
                });
            }
            Effect::OpenTransport {
                epoch,
                access_token,
            } => {
                if let Some(previous) = self.transport.take() {
                    previous.close();
                }
                match transport_url(&self.settings.chat_endpoint, &access_token) {
                    Ok(url) => {
                        let sink = TransportSink::new(epoch, self.events_tx.clone());
                        self.transport = Some(self.connector.connect(url, sink));
                    }
                    Err(e) => {
                        let _ = self.events_tx.send(Event::ConnectFailed {
                            epoch,
                            error: e.to_string(),
                        });
                    }
                }
            }
            Effect::Send(text) => match &self.transport {
                Some(transport) if transport.send(encode_outbound(&text)) => {}
                _ => warn!("No running transport for outbound frame"),
            },
            Effect::CloseTransport => {
                if let Some(transport) = self.transport.take() {
                    debug!("Closing assistant transport");
                    transport.close();
                }
            }
            Effect::ScheduleResponseBlock { epoch } => {
                let delay = self.settings.response_block_delay;
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Event::ResponseBlockDue { epoch });
                });
            }
            Effect::Navigate(path) => {
                if self.navigations.send(path).is_err() {
                    warn!("Navigation receiver dropped");
                }
            }
        }
    }
}
