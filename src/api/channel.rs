//! Purpose: Deliver widget data from the URL, or from the embedding host when the URL has none.
//! Exports: `HostLink`, `HostEnd`, `FallbackChannel`, `CancelHandle`, `ChannelState`,
//! `DataSource`, `Resolution`, `load_widget_data`, `ready_message`.
//! Role: The only async piece of the crate; the codec below it stays synchronous.
//! Invariants: The listener is registered before `ready` is posted, so replies to `ready` are never missed.
//! Invariants: `ready` is posted at most once per channel.
//! Invariants: Unrecognized host messages are dropped (debug log), never surfaced as errors.
//! Invariants: After cancellation no later message is consumed and the listener is gone.
//! Notes: There is no timeout here; callers wrap `resolve` in one if they need it.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};

use crate::api::cards::{CARDS_FIELD, FLASHCARDS_WIDGET};
use crate::api::params::WidgetParams;
use crate::core::Codec;
use crate::core::error::{Error, ErrorKind};

/// Widget side of the embedding context.
///
/// Host → widget traffic fans out to every registered listener, each with its own
/// unbounded queue. Messages posted with no listener are lost, like `postMessage`
/// into a frame that has not attached its handler yet. Dropping a listener
/// deregisters it. Widget → host traffic is an unbounded queue.
#[derive(Clone, Debug)]
pub struct HostLink {
    inbound: Listeners,
    outbound: mpsc::UnboundedSender<Value>,
}

type Listeners = Arc<Mutex<Vec<mpsc::UnboundedSender<Value>>>>;

/// Host side of a [`HostLink`]. Dropping it (or calling [`HostEnd::close`]) closes the link.
#[derive(Debug)]
pub struct HostEnd {
    inbound: Listeners,
    outbound: mpsc::UnboundedReceiver<Value>,
}

impl HostLink {
    pub fn pair() -> (HostLink, HostEnd) {
        let inbound = Listeners::default();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let link = HostLink {
            inbound: Arc::clone(&inbound),
            outbound: outbound_tx,
        };
        let host = HostEnd {
            inbound,
            outbound: outbound_rx,
        };
        (link, host)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut listeners = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|listener| !listener.is_closed());
        listeners.push(tx);
        rx
    }

    fn post_to_host(&self, message: Value) -> Result<(), Error> {
        self.outbound.send(message).map_err(|_| {
            Error::new(ErrorKind::Cancelled).with_message("host link closed before ready was sent")
        })
    }

    async fn closed(&self) {
        self.outbound.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl HostEnd {
    /// Returns how many widget listeners saw the message; `0` means it was lost.
    pub fn post_to_widget(&self, message: Value) -> usize {
        let mut listeners = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|listener| listener.send(message.clone()).is_ok());
        listeners.len()
    }

    pub async fn recv_from_widget(&mut self) -> Option<Value> {
        self.outbound.recv().await
    }

    pub fn try_recv_from_widget(&mut self) -> Option<Value> {
        self.outbound.try_recv().ok()
    }

    pub fn listener_count(&self) -> usize {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|listener| !listener.is_closed())
            .count()
    }

    pub fn close(&mut self) {
        self.outbound.close();
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelState {
    AwaitingUrlData,
    AwaitingMessage,
    Resolved,
    Cancelled,
}

impl ChannelState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelState::AwaitingUrlData => "awaiting-url-data",
            ChannelState::AwaitingMessage => "awaiting-message",
            ChannelState::Resolved => "resolved",
            ChannelState::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataSource {
    Url,
    Message,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Url => "url",
            DataSource::Message => "message",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub source: DataSource,
    pub value: Value,
}

/// Owner-side switch that stops a channel from consuming anything further.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

pub struct FallbackChannel {
    widget: String,
    payload_field: String,
    codec: Codec,
    state: ChannelState,
    ready_sent: bool,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl FallbackChannel {
    pub fn new(widget: impl Into<String>, payload_field: impl Into<String>) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            widget: widget.into(),
            payload_field: payload_field.into(),
            codec: Codec::default(),
            state: ChannelState::AwaitingUrlData,
            ready_sent: false,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    pub fn flashcards() -> Self {
        Self::new(FLASHCARDS_WIDGET, CARDS_FIELD)
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn widget(&self) -> &str {
        &self.widget
    }

    pub fn payload_field(&self) -> &str {
        &self.payload_field
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Resolve from `url_token` if it decodes, otherwise wait for a matching host message.
    pub async fn resolve(
        &mut self,
        url_token: Option<&str>,
        link: &HostLink,
    ) -> Result<Resolution, Error> {
        if self.state == ChannelState::Resolved {
            return Err(Error::new(ErrorKind::Usage).with_message("channel already resolved"));
        }
        if self.state == ChannelState::Cancelled || self.is_cancelled() {
            return Err(self.cancelled("channel cancelled before resolve"));
        }

        if self.state == ChannelState::AwaitingUrlData {
            if let Some(raw) = url_token.filter(|raw| !raw.is_empty()) {
                match self.codec.decode_param(raw) {
                    Ok(value) => {
                        self.state = ChannelState::Resolved;
                        tracing::debug!(widget = %self.widget, "resolved from url token");
                        return Ok(Resolution {
                            source: DataSource::Url,
                            value,
                        });
                    }
                    Err(err) => {
                        tracing::warn!(
                            widget = %self.widget,
                            error = %err,
                            "url token did not decode; waiting for host message"
                        );
                    }
                }
            }
            self.state = ChannelState::AwaitingMessage;
        }

        let mut listener = link.subscribe();
        if !self.ready_sent {
            if let Err(err) = link.post_to_host(ready_message(&self.widget)) {
                self.state = ChannelState::Cancelled;
                return Err(err);
            }
            self.ready_sent = true;
            tracing::debug!(widget = %self.widget, "ready posted to host");
        }

        let mut cancel = self.cancel_rx.clone();
        loop {
            tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancel) => {
                    return Err(self.cancelled("channel cancelled by owner"));
                }
                _ = link.closed() => {
                    return Err(self.cancelled("host link closed"));
                }
                received = listener.recv() => match received {
                    Some(message) => match self.accept(&message) {
                        Ok(value) => {
                            self.state = ChannelState::Resolved;
                            return Ok(Resolution {
                                source: DataSource::Message,
                                value,
                            });
                        }
                        Err(err) => {
                            tracing::debug!(widget = %self.widget, error = %err, "ignoring host message");
                        }
                    },
                    None => {
                        return Err(self.cancelled("host link closed"));
                    }
                },
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    fn cancelled(&mut self, message: &str) -> Error {
        self.state = ChannelState::Cancelled;
        Error::new(ErrorKind::Cancelled).with_message(message)
    }

    fn accept(&self, message: &Value) -> Result<Value, Error> {
        let Some(body) = message.as_object() else {
            return Err(malformed("message is not an object"));
        };
        let Some(kind) = body.get("type").and_then(Value::as_str) else {
            return Err(malformed("message has no string type"));
        };
        if kind != self.widget {
            return Err(malformed(format!("message type `{kind}` is for another widget")));
        }
        match body.get(&self.payload_field) {
            Some(payload @ Value::Array(_)) => Ok(payload.clone()),
            _ => Err(malformed(format!(
                "message field `{}` is not an array",
                self.payload_field
            ))),
        }
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nobody can cancel any more.
            std::future::pending::<()>().await;
        }
    }
}

fn malformed(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::MalformedMessage).with_message(message)
}

pub fn ready_message(widget: &str) -> Value {
    json!({"type": "ready", "widget": widget})
}

/// Load widget data the way an embedded widget page does: `data_b64`, then `data`,
/// then whatever the host posts after `ready`.
pub async fn load_widget_data(
    channel: &mut FallbackChannel,
    params: &WidgetParams,
    link: &HostLink,
) -> Result<Resolution, Error> {
    let raw = params.raw_data().map(|(param, raw)| {
        if params.debug {
            tracing::info!(param, prefix = %raw.chars().take(50).collect::<String>(), "raw widget param");
        }
        raw
    });
    channel.resolve(raw, link).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::api::cards::example_cards;

    fn cards_message() -> Value {
        json!({"type": "flashcards", "cards": [{"Q": "q", "A": "a", "T": "t"}]})
    }

    async fn wait_for_listener(host: &HostEnd) {
        while host.listener_count() == 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn url_token_resolves_without_ready() {
        let codec = Codec::default();
        let token = codec.encode(&example_cards()).unwrap();
        let (link, mut host) = HostLink::pair();
        let mut channel = FallbackChannel::flashcards();

        let resolution = channel.resolve(Some(&token), &link).await.unwrap();
        assert_eq!(resolution.source, DataSource::Url);
        assert_eq!(resolution.value, serde_json::to_value(example_cards()).unwrap());
        assert_eq!(channel.state(), ChannelState::Resolved);
        assert!(host.try_recv_from_widget().is_none());
    }

    #[tokio::test]
    async fn missing_token_sends_one_ready_then_takes_matching_message() {
        let (link, mut host) = HostLink::pair();
        let mut channel = FallbackChannel::flashcards();
        let task = tokio::spawn(async move {
            let result = channel.resolve(None, &link).await;
            (result, channel.state())
        });

        let ready = host.recv_from_widget().await.unwrap();
        assert_eq!(ready, json!({"type": "ready", "widget": "flashcards"}));
        // Listener is registered before ready goes out.
        assert_eq!(host.listener_count(), 1);

        assert_eq!(host.post_to_widget(json!({"type": "quiz", "cards": []})), 1);
        assert_eq!(host.post_to_widget(json!({"type": "flashcards", "cards": "x"})), 1);
        assert_eq!(host.post_to_widget(json!("flashcards")), 1);
        host.post_to_widget(cards_message());

        let (result, state) = task.await.unwrap();
        let resolution = result.unwrap();
        assert_eq!(resolution.source, DataSource::Message);
        assert_eq!(resolution.value, cards_message()["cards"]);
        assert_eq!(state, ChannelState::Resolved);
        assert!(host.try_recv_from_widget().is_none());
        assert_eq!(host.listener_count(), 0);
    }

    #[tokio::test]
    async fn undecodable_url_token_falls_back_to_messages() {
        let (link, mut host) = HostLink::pair();
        let mut channel = FallbackChannel::flashcards();
        let task = tokio::spawn(async move { channel.resolve(Some("%7Bnot json"), &link).await });

        let ready = host.recv_from_widget().await.unwrap();
        assert_eq!(ready["type"], "ready");
        host.post_to_widget(cards_message());
        let resolution = task.await.unwrap().unwrap();
        assert_eq!(resolution.source, DataSource::Message);
    }

    #[tokio::test]
    async fn cancel_stops_pending_resolve_and_drops_listener() {
        let (link, mut host) = HostLink::pair();
        let mut channel = FallbackChannel::flashcards();
        let cancel = channel.cancel_handle();
        let task = tokio::spawn(async move {
            let result = channel.resolve(None, &link).await;
            (result, channel.state())
        });

        host.recv_from_widget().await.unwrap();
        wait_for_listener(&host).await;
        cancel.cancel();

        let (result, state) = task.await.unwrap();
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);
        assert_eq!(state, ChannelState::Cancelled);
        assert_eq!(host.listener_count(), 0);
        assert_eq!(host.post_to_widget(cards_message()), 0);
    }

    #[tokio::test]
    async fn cancel_before_resolve_posts_nothing() {
        let (link, mut host) = HostLink::pair();
        let mut channel = FallbackChannel::flashcards();
        channel.cancel_handle().cancel();

        let err = channel.resolve(None, &link).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(host.try_recv_from_widget().is_none());
    }

    #[tokio::test]
    async fn closed_host_link_cancels() {
        let (link, mut host) = HostLink::pair();
        let mut channel = FallbackChannel::flashcards();
        let task = tokio::spawn(async move { channel.resolve(None, &link).await });

        host.recv_from_widget().await.unwrap();
        host.close();
        let err = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn reply_to_ready_survives_a_burst_of_later_messages() {
        let (link, mut host) = HostLink::pair();
        let mut channel = FallbackChannel::flashcards();
        let task = tokio::spawn(async move { channel.resolve(None, &link).await });

        host.recv_from_widget().await.unwrap();
        assert_eq!(host.post_to_widget(json!({"type": "flashcards", "cards": [1]})), 1);
        for n in 0..100 {
            host.post_to_widget(json!({"type": "other", "n": n}));
        }

        let resolution = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(resolution.value, json!([1]));
    }

    #[tokio::test]
    async fn custom_widget_and_field() {
        let (link, mut host) = HostLink::pair();
        let mut channel = FallbackChannel::new("quiz", "items");
        let task = tokio::spawn(async move { channel.resolve(None, &link).await });

        assert_eq!(host.recv_from_widget().await.unwrap()["widget"], "quiz");
        host.post_to_widget(cards_message());
        host.post_to_widget(json!({"type": "quiz", "items": [1, 2]}));
        assert_eq!(task.await.unwrap().unwrap().value, json!([1, 2]));
    }

    #[tokio::test]
    async fn loader_prefers_data_b64_over_data() {
        let codec = Codec::default();
        let preferred = codec.encode(&json!([{"Q": "b64", "A": "a", "T": "t"}])).unwrap();
        let legacy = codec.encode(&json!([{"Q": "legacy", "A": "a", "T": "t"}])).unwrap();
        let params = WidgetParams {
            data_b64: Some(preferred),
            data: Some(legacy),
            ..WidgetParams::default()
        };
        let (link, _host) = HostLink::pair();
        let mut channel = FallbackChannel::flashcards();

        let resolution = load_widget_data(&mut channel, &params, &link).await.unwrap();
        assert_eq!(resolution.value[0]["Q"], "b64");
    }

    #[tokio::test]
    async fn loader_reads_browser_mangled_token() {
        // Standard-alphabet token whose unencoded `+` arrives as a space.
        let params = WidgetParams::from_url(
            "https://w.example/widgets/quiz?data_b64=b64_eyJrIjoiPz8+PiJ9",
        )
        .unwrap();
        assert_eq!(params.data_b64.as_deref(), Some("b64_eyJrIjoiPz8 PiJ9"));
        let (link, _host) = HostLink::pair();
        let mut channel = FallbackChannel::new("quiz", "items");

        let resolution = load_widget_data(&mut channel, &params, &link).await.unwrap();
        assert_eq!(resolution.source, DataSource::Url);
        assert_eq!(resolution.value, json!({"k": "??>>"}));
    }
}
