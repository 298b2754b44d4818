//! WebSocket implementation of the event channel.
//!
//! One background task owns the socket. It reconnects on its own after a
//! drop and reports every (re)connection and loss through the queue, so the
//! session can re-join. Outbound frames reach the task over an unbounded
//! channel; inbound frames and acks leave it through the [`EventProducer`].

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        self,
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
        protocol::Message,
    },
};

use super::{
    EventProducer, EventSink, TransportError, TransportEvent, reconnect::should_attempt_reconnect,
};
use crate::infrastructure::dto::{InboundFrame, OutboundEvent, OutboundFrame};

const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 5;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: String,
    /// Sent as `Authorization: Bearer <token>` on every handshake
    pub bearer_token: Option<String>,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl WebSocketConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
            reconnect_interval: RECONNECT_INTERVAL,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn with_reconnect(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.reconnect_interval = interval;
        self.max_reconnect_attempts = max_attempts;
        self
    }
}

#[derive(Debug, Default)]
struct Shared {
    connected: AtomicBool,
    next_ack_id: AtomicU64,
}

pub struct WebSocketTransport {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    task: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Spawn the connection task and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect<T>(config: WebSocketConfig, events: EventProducer<T>) -> Self
    where
        T: From<TransportEvent> + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_transport(config, shared.clone(), outbound_rx, events));
        Self {
            shared,
            outbound,
            task,
        }
    }

    fn send(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        if !self.is_connected() {
            tracing::debug!("Dropping '{}': not connected", frame.event);
            return Err(TransportError::NotConnected);
        }
        tracing::debug!("-> {} {}", frame.event, frame.data);
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }
}

impl EventSink for WebSocketTransport {
    fn emit(&self, event: OutboundEvent, data: Value) -> Result<(), TransportError> {
        self.send(OutboundFrame::new(event.name(), data, None))
    }

    fn emit_with_ack(&self, event: OutboundEvent, data: Value) -> Result<u64, TransportError> {
        let id = self.shared.next_ack_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.send(OutboundFrame::new(event.name(), data, Some(id)))?;
        Ok(id)
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        tracing::info!("Closing event channel");
        self.task.abort();
        self.shared.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn open(config: &WebSocketConfig) -> Result<WsStream, TransportError> {
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::Connection(e.to_string()))?;
    if let Some(token) = config.bearer_token.as_deref() {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    match connect_async(request).await {
        Ok((stream, _response)) => Ok(stream),
        Err(tungstenite::Error::Http(response))
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            Err(TransportError::Unauthorized(response.status().as_u16()))
        }
        Err(e) => Err(TransportError::Connection(e.to_string())),
    }
}

async fn run_transport<T>(
    config: WebSocketConfig,
    shared: Arc<Shared>,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    events: EventProducer<T>,
) where
    T: From<TransportEvent>,
{
    let mut failures = 0;

    loop {
        tracing::info!(
            "Connecting to {} (attempt {}/{})",
            config.url,
            failures + 1,
            config.max_reconnect_attempts
        );

        let error = match open(&config).await {
            Ok(stream) => {
                failures = 0;
                // frames emitted while disconnected were already refused
                while outbound_rx.try_recv().is_ok() {}
                shared.connected.store(true, Ordering::SeqCst);
                tracing::info!("Connected to {}", config.url);
                if !events.push(TransportEvent::Connected) {
                    return;
                }

                let outcome = pump(stream, &mut outbound_rx, &events).await;
                shared.connected.store(false, Ordering::SeqCst);
                events.push(TransportEvent::Disconnected);
                match outcome {
                    Ok(()) => {
                        tracing::info!("Event channel closed");
                        return;
                    }
                    Err(e) => e,
                }
            }
            Err(e) => {
                failures += 1;
                e
            }
        };

        if !should_attempt_reconnect(&error, failures, config.max_reconnect_attempts) {
            tracing::error!("Giving up on {}: {}", config.url, error);
            return;
        }
        tracing::warn!(
            "Connection lost: {}. Reconnecting in {:?}",
            error,
            config.reconnect_interval
        );
        tokio::time::sleep(config.reconnect_interval).await;
    }
}

/// Shuttle frames until the socket drops (`Err`) or the transport is released (`Ok`).
async fn pump<T>(
    stream: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundFrame>,
    events: &EventProducer<T>,
) -> Result<(), TransportError>
where
    T: From<TransportEvent>,
{
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if !dispatch(text.as_str(), events) {
                        return Ok(());
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(TransportError::Connection(
                        "Server closed the connection".to_string(),
                    ));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Connection(e.to_string())),
            },
            frame = outbound_rx.recv() => match frame {
                Some(frame) => {
                    let json = serde_json::to_string(&frame)?;
                    write
                        .send(Message::Text(json.into()))
                        .await
                        .map_err(|e| TransportError::Connection(e.to_string()))?;
                }
                None => {
                    write.send(Message::Close(None)).await.ok();
                    return Ok(());
                }
            },
        }
    }
}

/// Forward one text frame. Returns `false` once the consumer is gone.
fn dispatch<T>(text: &str, events: &EventProducer<T>) -> bool
where
    T: From<TransportEvent>,
{
    let event = match serde_json::from_str::<InboundFrame>(text) {
        Ok(InboundFrame::Event { event, data }) => {
            tracing::debug!("<- {}", event);
            TransportEvent::Message {
                name: event,
                payload: data,
            }
        }
        Ok(InboundFrame::Ack { ack, data }) => TransportEvent::Ack {
            id: ack,
            payload: data,
        },
        Err(e) => {
            tracing::warn!("Dropping malformed frame: {}", e);
            return true;
        }
    };
    events.push(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::event_queue;
    use serde_json::json;

    #[test]
    fn test_dispatch_event_frame() {
        // テスト項目: イベントフレームが Message としてキューに入る
        // given (前提条件):
        let (producer, mut queue) = event_queue::<TransportEvent>();

        // when (操作):
        let alive = dispatch(r#"{"event":"room:update","data":{"code":"ABC123"}}"#, &producer);

        // then (期待する結果):
        assert!(alive);
        assert_eq!(
            queue.drain(),
            vec![TransportEvent::Message {
                name: "room:update".to_string(),
                payload: json!({"code": "ABC123"})
            }]
        );
    }

    #[test]
    fn test_dispatch_malformed_frame_is_dropped() {
        // テスト項目: JSON でないフレームは捨てられ、接続は維持される
        // given (前提条件):
        let (producer, mut queue) = event_queue::<TransportEvent>();

        // when (操作):
        let alive = dispatch("not json", &producer);

        // then (期待する結果):
        assert!(alive);
        assert!(queue.drain().is_empty());
    }

    #[tokio::test]
    async fn test_emit_while_disconnected_fails() {
        // テスト項目: 未接続の間の送信は NotConnected で失敗する
        // given (前提条件):
        let (producer, _queue) = event_queue::<TransportEvent>();
        let config = WebSocketConfig::new("ws://127.0.0.1:9/ws")
            .with_reconnect(Duration::from_millis(10), 1);
        let transport = WebSocketTransport::connect(config, producer);

        // when (操作):
        let result = transport.emit(OutboundEvent::RoomSync, json!({"code": "ABC123"}));

        // then (期待する結果):
        assert!(matches!(result, Err(TransportError::NotConnected)));
        transport.disconnect();
    }
}
