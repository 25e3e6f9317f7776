use crate::debounce::TabController;
use crate::guard::{NavigationEvent, NavigationGuard, PageSignals};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::{debug, error, info, warn};

/// Messages arriving on stdin from the browser-side collaborator. Each frame
/// is a length-prefixed JSON object tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum InboundMessage {
    Navigation(NavigationEvent),
    PageSignals(PageSignals),
}

/// Messages we push back over stdout.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    UpdateTab { tab_id: i64, url: String },
}

// Native-messaging framing: 4-byte little-endian length prefix.
fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .little_endian()
        .new_codec()
}

/// [`TabController`] that asks the browser side to retarget a tab. Redirects
/// are funneled through a channel so concurrent handlers never interleave
/// writes on the single stdout frame stream.
pub struct StdioTabController {
    tx: mpsc::Sender<OutboundMessage>,
}

impl StdioTabController {
    /// Spawns the writer task over `out` and returns the controller handle.
    pub fn spawn<W>(out: W) -> Arc<Self>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

        tokio::spawn(async move {
            let mut writer = FramedWrite::new(out, codec());
            while let Some(msg) = rx.recv().await {
                let payload = match serde_json::to_vec(&msg) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Failed to encode outbound message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = writer.send(Bytes::from(payload)).await {
                    error!("Failed to write outbound frame: {}", e);
                    break;
                }
            }
        });

        Arc::new(Self { tx })
    }
}

#[async_trait::async_trait]
impl TabController for StdioTabController {
    async fn update_tab(&self, tab_id: i64, url: &str) -> Result<()> {
        self.tx
            .send(OutboundMessage::UpdateTab {
                tab_id,
                url: url.to_string(),
            })
            .await
            .context("outbound message channel closed")
    }
}

/// Reads frames from `input` until EOF, dispatching each to the guard on its
/// own task. Malformed or unknown frames are logged and skipped; only a read
/// error on the underlying stream ends the loop early.
pub async fn run_host_loop<R>(input: R, guard: Arc<NavigationGuard>) -> Result<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut reader = FramedRead::new(input, codec());

    while let Some(frame) = reader.next().await {
        let frame = frame.context("failed to read inbound frame")?;

        let message: InboundMessage = match serde_json::from_slice(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping unparseable inbound frame: {}", e);
                continue;
            }
        };

        let guard = guard.clone();
        match message {
            InboundMessage::Navigation(event) => {
                debug!("Navigation event: tab {} -> {}", event.tab_id, event.url);
                tokio::spawn(async move {
                    guard.handle_navigation(&event).await;
                });
            }
            InboundMessage::PageSignals(signals) => {
                debug!("Page signals: tab {} ({})", signals.tab_id, signals.url);
                tokio::spawn(async move {
                    guard.handle_page_signals(&signals).await;
                });
            }
        }
    }

    info!("Host stream closed, stopping message loop");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(json: &str) -> Vec<u8> {
        let mut out = (json.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(json.as_bytes());
        out
    }

    #[test]
    fn test_inbound_message_tags() {
        let nav: InboundMessage = serde_json::from_str(
            r#"{"type":"navigation","tabId":3,"frameId":0,"url":"https://example.com/"}"#,
        )
        .unwrap();
        assert!(matches!(nav, InboundMessage::Navigation(_)));

        let page: InboundMessage = serde_json::from_str(
            r#"{"type":"pageSignals","tabId":3,"url":"https://example.com/","title":"Example","text":"hello"}"#,
        )
        .unwrap();
        assert!(matches!(page, InboundMessage::PageSignals(_)));

        let unknown = serde_json::from_str::<InboundMessage>(r#"{"type":"telemetry"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_outbound_update_tab_shape() {
        let msg = OutboundMessage::UpdateTab {
            tab_id: 9,
            url: "http://localhost:8080/block.html".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "updateTab");
        assert_eq!(json["tabId"], 9);
        assert_eq!(json["url"], "http://localhost:8080/block.html");
    }

    #[tokio::test]
    async fn test_writer_emits_length_prefixed_frames() {
        let (client, mut server) = tokio::io::duplex(1024);
        let controller = StdioTabController::spawn(client);

        controller.update_tab(4, "http://blocked/").await.unwrap();

        let mut reader = FramedRead::new(&mut server, codec());
        let frame = reader.next().await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(json["type"], "updateTab");
        assert_eq!(json["tabId"], 4);
    }

    #[tokio::test]
    async fn test_loop_skips_garbage_and_ends_on_eof() {
        let mut input = frame(r#"{"type":"bogus"}"#);
        input.extend(frame("not json at all"));

        let cursor = std::io::Cursor::new(input);
        // A guard is required by signature but never reached by bad frames,
        // so feed the loop only frames it will skip.
        let guard = crate::guard::test_support::minimal_guard().await;
        run_host_loop(cursor, guard).await.unwrap();
    }
}
