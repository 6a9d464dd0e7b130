//! Notice store: the single owner of the draft collection and the bulletin
//! mirror.
//!
//! [`NoticeStore::spawn`] moves all state into one task. Callers talk to it
//! through a cloneable [`StoreHandle`], which sends [`Command`]s over a
//! channel. Remote calls run on their own tasks and post a [`Completion`]
//! back to the owner, so every mutation of drafts or bulletin happens on the
//! owner task in the order its messages arrive.
//!
//! Protocol:
//! - `publish`: create remotely; only once that succeeds, drop the matching
//!   draft and refresh. On failure nothing local changes.
//! - `delete_from_bulletin`: delete remotely; on success refresh.
//! - `refresh`: fetch the full remote snapshot and replace the mirror
//!   wholesale. On failure the old mirror stays. Each fetch carries a token
//!   and a completion older than the last applied one is discarded.
//!
//! There is no retry and no client-side timeout on any remote call.

use noticeboard_core::{Notice, NoticeId, SUBSCRIPTION_ID};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{RemoteError, StoreError};
use crate::push::{PushOutcome, PushSignal, RefreshTrigger};
use crate::repository::NoticeRepository;
use crate::state::{FetchToken, SyncState};
use crate::subscription::SubscriptionManager;

const EVENT_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<T>;

/// Observable changes and failures, for surfacing to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    DraftsChanged,
    BulletinReplaced { count: usize },
    Published { id: NoticeId },
    PublishFailed { id: NoticeId, cause: String },
    Deleted { id: NoticeId },
    DeleteFailed { id: NoticeId, cause: String },
    RefreshFailed { cause: String },
}

/// Requests from handles to the owner task.
#[derive(Debug)]
enum Command {
    SaveDraft(Notice),
    DeleteDrafts(Vec<usize>),
    Publish {
        notice: Notice,
        reply: Reply<Result<(), RemoteError>>,
    },
    DeleteFromBulletin {
        id: NoticeId,
        reply: Reply<Result<(), RemoteError>>,
    },
    Refresh {
        trigger: RefreshTrigger,
        reply: Option<Reply<Result<(), RemoteError>>>,
    },
    Drafts(Reply<Vec<Notice>>),
    Bulletin(Reply<Vec<Notice>>),
    Find {
        id: NoticeId,
        reply: Reply<Option<Notice>>,
    },
}

/// Results of remote calls, marshalled back to the owner task.
#[derive(Debug)]
enum Completion {
    Published {
        id: NoticeId,
        result: Result<(), RemoteError>,
        reply: Reply<Result<(), RemoteError>>,
    },
    Deleted {
        id: NoticeId,
        result: Result<(), RemoteError>,
        reply: Reply<Result<(), RemoteError>>,
    },
    Fetched {
        token: FetchToken,
        trigger: RefreshTrigger,
        result: Result<Vec<Notice>, RemoteError>,
        reply: Option<Reply<Result<(), RemoteError>>>,
    },
}

/// Owner task state. Constructed and driven only by [`NoticeStore::spawn`].
pub struct NoticeStore {
    repository: NoticeRepository,
    state: SyncState,
    commands: mpsc::UnboundedReceiver<Command>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    drafts_tx: watch::Sender<Vec<Notice>>,
    bulletin_tx: watch::Sender<Vec<Notice>>,
    events: broadcast::Sender<StoreEvent>,
}

impl NoticeStore {
    /// Start the owner task, kick off the initial fetch, and make sure the
    /// change subscription exists.
    ///
    /// Must be called from within a Tokio runtime. The task stops once every
    /// [`StoreHandle`] has been dropped.
    pub fn spawn(repository: NoticeRepository, subscriptions: SubscriptionManager) -> StoreHandle {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (drafts_tx, drafts_rx) = watch::channel(Vec::new());
        let (bulletin_tx, bulletin_rx) = watch::channel(Vec::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let store = Self {
            repository,
            state: SyncState::default(),
            commands,
            completions,
            completions_tx,
            drafts_tx,
            bulletin_tx,
            events: events.clone(),
        };

        // Fire and forget: a missing subscription only means manual refresh.
        drop(subscriptions.spawn_ensure());
        tokio::spawn(store.run());

        StoreHandle {
            commands: commands_tx,
            drafts: drafts_rx,
            bulletin: bulletin_rx,
            events,
        }
    }

    async fn run(mut self) {
        info!("notice store started");
        self.start_fetch(RefreshTrigger::Startup, None);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(done) = self.completions.recv() => self.handle_completion(done),
            }
        }
        info!("notice store stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SaveDraft(notice) => {
                debug!(id = %notice.id, kind = %notice.kind, "saving draft");
                self.state.save_draft(notice);
                self.publish_drafts();
            }
            Command::DeleteDrafts(indices) => {
                let invalid = self.state.delete_drafts(&indices);
                if !invalid.is_empty() {
                    warn!(?invalid, "ignoring out-of-range draft indices");
                }
                self.publish_drafts();
            }
            Command::Publish { notice, reply } => self.start_publish(notice, reply),
            Command::DeleteFromBulletin { id, reply } => self.start_delete(id, reply),
            Command::Refresh { trigger, reply } => self.start_fetch(trigger, reply),
            Command::Drafts(reply) => {
                let _ = reply.send(self.state.drafts().to_vec());
            }
            Command::Bulletin(reply) => {
                let _ = reply.send(self.state.bulletin().to_vec());
            }
            Command::Find { id, reply } => {
                let _ = reply.send(self.state.find(id).cloned());
            }
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Published { id, result, reply } => {
                match &result {
                    Ok(()) => {
                        info!(id = %id, "notice published");
                        if self.state.remove_draft(id) {
                            self.publish_drafts();
                        }
                        self.emit(StoreEvent::Published { id });
                        self.start_fetch(RefreshTrigger::AfterPublish, None);
                    }
                    Err(e) => {
                        error!(id = %id, error = %e, "publish failed, draft kept");
                        self.emit(StoreEvent::PublishFailed {
                            id,
                            cause: e.to_string(),
                        });
                    }
                }
                let _ = reply.send(result);
            }
            Completion::Deleted { id, result, reply } => {
                match &result {
                    Ok(()) => {
                        info!(id = %id, "notice deleted from bulletin");
                        self.emit(StoreEvent::Deleted { id });
                        self.start_fetch(RefreshTrigger::AfterDelete, None);
                    }
                    Err(e) => {
                        error!(id = %id, error = %e, "delete failed, bulletin kept");
                        self.emit(StoreEvent::DeleteFailed {
                            id,
                            cause: e.to_string(),
                        });
                    }
                }
                let _ = reply.send(result);
            }
            Completion::Fetched {
                token,
                trigger,
                result,
                reply,
            } => {
                let outcome = match result {
                    Ok(notices) => {
                        let count = notices.len();
                        if self.state.apply_fetch(token, notices) {
                            info!(count, %trigger, "bulletin replaced");
                            self.bulletin_tx
                                .send_replace(self.state.bulletin().to_vec());
                            self.emit(StoreEvent::BulletinReplaced { count });
                        } else {
                            debug!(token, %trigger, "discarding stale fetch");
                        }
                        Ok(())
                    }
                    Err(e) => {
                        error!(
                            error = %e,
                            %trigger,
                            "bulletin fetch failed, keeping last snapshot"
                        );
                        self.emit(StoreEvent::RefreshFailed {
                            cause: e.to_string(),
                        });
                        Err(e)
                    }
                };
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
        }
    }

    fn start_publish(&self, notice: Notice, reply: Reply<Result<(), RemoteError>>) {
        info!(id = %notice.id, "publishing notice");
        let repository = self.repository.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = repository.create(&notice).await;
            let _ = tx.send(Completion::Published {
                id: notice.id,
                result,
                reply,
            });
        });
    }

    fn start_delete(&self, id: NoticeId, reply: Reply<Result<(), RemoteError>>) {
        info!(id = %id, "deleting notice from bulletin");
        let repository = self.repository.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = repository.delete(id).await;
            let _ = tx.send(Completion::Deleted { id, result, reply });
        });
    }

    fn start_fetch(
        &mut self,
        trigger: RefreshTrigger,
        reply: Option<Reply<Result<(), RemoteError>>>,
    ) {
        let token = self.state.begin_fetch();
        debug!(token, %trigger, "refreshing bulletin");
        let repository = self.repository.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = repository.query_all().await;
            let _ = tx.send(Completion::Fetched {
                token,
                trigger,
                result,
                reply,
            });
        });
    }

    fn publish_drafts(&self) {
        self.drafts_tx.send_replace(self.state.drafts().to_vec());
        self.emit(StoreEvent::DraftsChanged);
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

/// Cloneable handle to a running [`NoticeStore`].
///
/// Commands are processed in the order they are sent from one handle, so a
/// snapshot requested after `save_draft` always includes that draft.
#[derive(Clone)]
pub struct StoreHandle {
    commands: mpsc::UnboundedSender<Command>,
    drafts: watch::Receiver<Vec<Notice>>,
    bulletin: watch::Receiver<Vec<Notice>>,
    events: broadcast::Sender<StoreEvent>,
}

impl StoreHandle {
    /// Append a notice to the draft collection.
    pub fn save_draft(&self, notice: Notice) -> Result<(), StoreError> {
        self.send(Command::SaveDraft(notice))
    }

    /// Remove drafts at the given positions.
    pub fn delete_drafts(&self, indices: Vec<usize>) -> Result<(), StoreError> {
        self.send(Command::DeleteDrafts(indices))
    }

    /// Publish `notice` to the shared bulletin. Resolves once the remote
    /// create has completed and, on success, the draft has been removed.
    pub async fn publish(&self, notice: Notice) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Publish { notice, reply })?;
        Ok(rx.await.map_err(|_| StoreError::Closed)??)
    }

    /// Delete `notice` from the shared bulletin.
    pub async fn delete_from_bulletin(&self, notice: &Notice) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::DeleteFromBulletin {
            id: notice.id,
            reply,
        })?;
        Ok(rx.await.map_err(|_| StoreError::Closed)??)
    }

    /// Fetch the remote snapshot and wait for it to be applied.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Refresh {
            trigger: RefreshTrigger::Manual,
            reply: Some(reply),
        })?;
        Ok(rx.await.map_err(|_| StoreError::Closed)??)
    }

    /// Request a refresh without waiting. Used for push signals, foreground
    /// transitions, and account changes alike.
    pub fn on_remote_change_signal(&self, trigger: RefreshTrigger) -> Result<(), StoreError> {
        self.send(Command::Refresh {
            trigger,
            reply: None,
        })
    }

    /// Route a push signal: refresh when it belongs to the notice
    /// subscription, otherwise ignore it.
    pub fn handle_push(&self, signal: &PushSignal) -> PushOutcome {
        route_push(&self.commands, signal)
    }

    /// Feed push signals from a transport into this store until the
    /// transport closes, or until the first signal after the store has shut
    /// down.
    ///
    /// The listener does not keep the store alive: once every
    /// [`StoreHandle`] is dropped the owner task stops and the listener exits.
    pub fn listen(&self, mut signals: broadcast::Receiver<PushSignal>) -> JoinHandle<()> {
        let commands = self.commands.downgrade();
        tokio::spawn(async move {
            loop {
                let received = signals.recv().await;
                let Some(commands) = commands.upgrade() else {
                    debug!("notice store gone, push listener exiting");
                    break;
                };
                match received {
                    Ok(signal) => {
                        route_push(&commands, &signal);
                    }
                    // Missed signals still mean something changed.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "push signals lagged");
                        let refresh = Command::Refresh {
                            trigger: RefreshTrigger::PushSignal,
                            reply: None,
                        };
                        if commands.send(refresh).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Current drafts, after every command sent so far has been applied.
    pub async fn drafts(&self) -> Result<Vec<Notice>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Drafts(reply))?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Current bulletin mirror.
    pub async fn bulletin(&self) -> Result<Vec<Notice>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Bulletin(reply))?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Find a notice by id in drafts or bulletin.
    pub async fn find(&self, id: NoticeId) -> Result<Option<Notice>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Find { id, reply })?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    pub fn watch_drafts(&self) -> watch::Receiver<Vec<Notice>> {
        self.drafts.clone()
    }

    pub fn watch_bulletin(&self) -> watch::Receiver<Vec<Notice>> {
        self.bulletin.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn send(&self, command: Command) -> Result<(), StoreError> {
        self.commands.send(command).map_err(|_| StoreError::Closed)
    }
}

fn route_push(commands: &mpsc::UnboundedSender<Command>, signal: &PushSignal) -> PushOutcome {
    if !signal.matches(SUBSCRIPTION_ID) {
        debug!(subscription = ?signal.subscription_id, "ignoring unrelated push signal");
        return PushOutcome::NoData;
    }
    let refresh = Command::Refresh {
        trigger: RefreshTrigger::PushSignal,
        reply: None,
    };
    match commands.send(refresh) {
        Ok(()) => PushOutcome::NewData,
        Err(_) => PushOutcome::NoData,
    }
}
