//! Channel registry and push tasks.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::action::{MethodAction, Verb};
use crate::dispatch::Dispatcher;
use crate::http::{Request, Response};
use crate::observability::metrics;

/// When a push action fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEvent {
    /// One task per path, broadcasting to every bound channel.
    Periodic,
    /// One task per bound channel, invoked with that channel's handshake.
    Request,
}

#[derive(Debug, Clone)]
pub struct PushAction {
    pub path: String,
    pub delay: Duration,
    pub event: PushEvent,
    pub action: Arc<MethodAction>,
}

/// A bound channel: outbound messages arrive on `receiver`.
pub struct SocketChannel {
    pub id: Uuid,
    pub path: String,
    pub sender: mpsc::Sender<String>,
    pub receiver: mpsc::Receiver<String>,
}

struct HubInner {
    dispatcher: Arc<Dispatcher>,
    pushes: HashMap<String, Vec<PushAction>>,
    channels: DashMap<String, HashMap<Uuid, mpsc::Sender<String>>>,
    /// Cancellation for the periodic tasks of a path.
    periodic: DashMap<String, watch::Sender<bool>>,
    /// Cancellation for the per-request tasks of a channel.
    per_channel: DashMap<Uuid, watch::Sender<bool>>,
    capacity: usize,
}

/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct SocketHub {
    inner: Arc<HubInner>,
}

impl SocketHub {
    pub fn new(dispatcher: Arc<Dispatcher>, pushes: Vec<PushAction>, capacity: usize) -> Self {
        let mut by_path: HashMap<String, Vec<PushAction>> = HashMap::new();
        for push in pushes {
            by_path.entry(push.path.clone()).or_default().push(push);
        }

        Self {
            inner: Arc::new(HubInner {
                dispatcher,
                pushes: by_path,
                channels: DashMap::new(),
                periodic: DashMap::new(),
                per_channel: DashMap::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn has_pushes(&self, path: &str) -> bool {
        self.inner.pushes.contains_key(path)
    }

    /// Paths with push actions, sorted.
    pub fn push_paths(&self) -> BTreeSet<String> {
        self.inner.pushes.keys().cloned().collect()
    }

    /// Register a channel on `path`. The first channel on a path starts its
    /// periodic pushes; per-request pushes start for every channel.
    pub fn bind(&self, path: &str, handshake: Request) -> SocketChannel {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let id = Uuid::new_v4();

        {
            let mut channels = self.inner.channels.entry(path.to_string()).or_default();
            channels.insert(id, sender.clone());
            if channels.len() == 1 {
                self.start_periodic(path);
            }
        }

        let per_request: Vec<PushAction> = self
            .pushes_for(path)
            .filter(|p| p.event == PushEvent::Request)
            .cloned()
            .collect();
        if !per_request.is_empty() {
            let (cancel, cancelled) = watch::channel(false);
            for push in per_request {
                let task = run_per_request(
                    self.inner.clone(),
                    push,
                    handshake.clone(),
                    sender.clone(),
                    cancelled.clone(),
                );
                tokio::spawn(task);
            }
            self.inner.per_channel.insert(id, cancel);
        }

        metrics::record_channel_bound();
        tracing::debug!(path = %path, channel = %id, "Socket channel bound");
        SocketChannel {
            id,
            path: path.to_string(),
            sender,
            receiver,
        }
    }

    /// Drop a channel. Unbinding the last channel of a path cancels its
    /// periodic pushes.
    pub fn unbind(&self, path: &str, id: Uuid) {
        if let Entry::Occupied(mut channels) = self.inner.channels.entry(path.to_string()) {
            if channels.get_mut().remove(&id).is_some() {
                metrics::record_channel_unbound();
            }
            if channels.get().is_empty() {
                channels.remove();
                if let Some((_, cancel)) = self.inner.periodic.remove(path) {
                    let _ = cancel.send(true);
                    tracing::debug!(path = %path, "Periodic pushes stopped");
                }
            }
        }

        if let Some((_, cancel)) = self.inner.per_channel.remove(&id) {
            let _ = cancel.send(true);
        }
        tracing::debug!(path = %path, channel = %id, "Socket channel unbound");
    }

    pub fn channel_count(&self, path: &str) -> usize {
        self.inner.channels.get(path).map(|c| c.len()).unwrap_or(0)
    }

    /// True while periodic pushes run for `path`.
    pub fn is_pushing(&self, path: &str) -> bool {
        self.inner.periodic.contains_key(path)
    }

    /// Queue `message` on every channel of `path`. Returns how many accepted it.
    pub fn broadcast(&self, path: &str, message: &str) -> usize {
        broadcast(&self.inner, path, message)
    }

    /// Cancel every push task and drop every channel.
    pub fn shutdown(&self) {
        for entry in self.inner.periodic.iter() {
            let _ = entry.value().send(true);
        }
        for entry in self.inner.per_channel.iter() {
            let _ = entry.value().send(true);
        }
        self.inner.periodic.clear();
        self.inner.per_channel.clear();
        self.inner.channels.clear();
        tracing::info!("Socket hub stopped");
    }

    fn pushes_for(&self, path: &str) -> impl Iterator<Item = &PushAction> {
        self.inner.pushes.get(path).into_iter().flatten()
    }

    fn start_periodic(&self, path: &str) {
        let periodic: Vec<PushAction> = self
            .pushes_for(path)
            .filter(|p| p.event == PushEvent::Periodic)
            .cloned()
            .collect();
        if periodic.is_empty() {
            return;
        }

        let (cancel, cancelled) = watch::channel(false);
        for push in periodic {
            tracing::debug!(path = %path, action = %push.action.name(), delay = ?push.delay, "Periodic push started");
            tokio::spawn(run_periodic(self.inner.clone(), push, cancelled.clone()));
        }
        self.inner.periodic.insert(path.to_string(), cancel);
    }
}

fn broadcast(inner: &HubInner, path: &str, message: &str) -> usize {
    let senders: Vec<mpsc::Sender<String>> = inner
        .channels
        .get(path)
        .map(|channels| channels.values().cloned().collect())
        .unwrap_or_default();

    senders
        .iter()
        .filter(|sender| match sender.try_send(message.to_string()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(path = %path, "Socket channel full, dropping push");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        })
        .count()
}

/// Invoke a push handler with default arguments. `None` on failure or for
/// an empty result.
fn push_message(inner: &HubInner, push: &PushAction, mut request: Request) -> Option<String> {
    let mut response = Response::new();
    match inner
        .dispatcher
        .invoke_with_defaults(&push.action, &mut request, &mut response)
    {
        Ok(rendered) => {
            let message = Some(rendered.model.to_message()).filter(|m| !m.is_empty())?;
            metrics::record_push(&push.path);
            Some(message)
        }
        Err(e) => {
            tracing::warn!(path = %push.path, action = %push.action.name(), error = %e, "Push handler failed");
            None
        }
    }
}

/// Resolves once cancellation is signalled or every sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

async fn run_periodic(inner: Arc<HubInner>, push: PushAction, mut cancel: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(push.delay) => {}
            _ = cancelled(&mut cancel) => break,
        }

        if let Some(message) = push_message(&inner, &push, Request::new(Verb::Ws, &push.path)) {
            broadcast(&inner, &push.path, &message);
        }
    }
}

async fn run_per_request(
    inner: Arc<HubInner>,
    push: PushAction,
    handshake: Request,
    sender: mpsc::Sender<String>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(push.delay) => {}
            _ = cancelled(&mut cancel) => break,
        }

        if let Some(message) = push_message(&inner, &push, handshake.clone()) {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::action::method::{Call, Reply};
    use crate::binder::BinderManager;
    use crate::dispatch::view::{ViewResolver, JSON_VIEW};
    use crate::dispatch::DispatchSettings;
    use crate::interceptor::InterceptorSet;

    fn push<F>(path: &str, event: PushEvent, handler: F) -> PushAction
    where
        F: Fn(&mut Call<'_>) -> Result<Reply, crate::dispatch::HandlerError> + Send + Sync + 'static,
    {
        PushAction {
            path: path.into(),
            delay: Duration::from_millis(10),
            event,
            action: Arc::new(MethodAction {
                handler_type: "Ticker".into(),
                method: "tick".into(),
                verb: Verb::Ws,
                pattern: path.into(),
                params: Vec::new(),
                markers: Vec::new(),
                view: None,
                interceptors: InterceptorSet::default(),
                handler: Arc::new(handler),
            }),
        }
    }

    fn hub(pushes: Vec<PushAction>) -> SocketHub {
        let dispatcher = Dispatcher::new(
            Arc::new(BinderManager::with_defaults()),
            ViewResolver::new(JSON_VIEW),
            DispatchSettings::default(),
        );
        SocketHub::new(Arc::new(dispatcher), pushes, 16)
    }

    async fn next(channel: &mut SocketChannel) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(2), channel.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_periodic_push_broadcasts() {
        let hub = hub(vec![push("/ticker", PushEvent::Periodic, |_call| Ok(Reply::text("tick")))]);
        assert!(!hub.is_pushing("/ticker"));

        let mut a = hub.bind("/ticker", Request::new(Verb::Ws, "/ticker"));
        let mut b = hub.bind("/ticker", Request::new(Verb::Ws, "/ticker"));
        assert!(hub.is_pushing("/ticker"));
        assert_eq!(next(&mut a).await.as_deref(), Some("tick"));
        assert_eq!(next(&mut b).await.as_deref(), Some("tick"));
    }

    #[tokio::test]
    async fn test_last_unbind_cancels_periodic_task() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let hub = hub(vec![push("/ticker", PushEvent::Periodic, move |_call| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::text("tick"))
        })]);

        let a = hub.bind("/ticker", Request::new(Verb::Ws, "/ticker"));
        let b = hub.bind("/ticker", Request::new(Verb::Ws, "/ticker"));
        hub.unbind("/ticker", a.id);
        assert!(hub.is_pushing("/ticker"));
        assert_eq!(hub.channel_count("/ticker"), 1);

        hub.unbind("/ticker", b.id);
        assert!(!hub.is_pushing("/ticker"));
        assert_eq!(hub.channel_count("/ticker"), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), settled);
    }

    #[tokio::test]
    async fn test_per_request_push_sees_handshake() {
        let hub = hub(vec![push("/me", PushEvent::Request, |call| {
            Ok(Reply::text(call.request().param("user").unwrap_or("anonymous").to_string()))
        })]);

        let mut alice = hub.bind("/me", Request::new(Verb::Ws, "/me?user=alice"));
        let mut bob = hub.bind("/me", Request::new(Verb::Ws, "/me?user=bob"));
        assert!(!hub.is_pushing("/me"));
        assert_eq!(next(&mut alice).await.as_deref(), Some("alice"));
        assert_eq!(next(&mut bob).await.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_broadcast_and_shutdown() {
        let hub = hub(Vec::new());
        let mut channel = hub.bind("/chat", Request::new(Verb::Ws, "/chat"));
        assert_eq!(hub.broadcast("/chat", "hello"), 1);
        assert_eq!(next(&mut channel).await.as_deref(), Some("hello"));

        hub.shutdown();
        assert_eq!(hub.channel_count("/chat"), 0);
        assert_eq!(hub.broadcast("/chat", "late"), 0);
    }
}
