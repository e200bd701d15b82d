use crate::error::{Result, StudioError};
use crate::models::{ByteStream, EventStream, ProviderOutput, StreamEvent};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

/// Result of reading an event stream to its end.
#[derive(Debug)]
pub enum Drained {
    /// At least one byte chunk arrived; all chunks concatenated in order.
    Binary(Bytes),
    /// No bytes ever arrived; the first structured event.
    Value(ProviderOutput),
    Empty,
}

/// Read every event before deciding, so the provider connection is closed
/// cleanly. Once a byte chunk is seen the stream is binary and structured
/// events are only logged.
pub async fn drain_events(mut events: EventStream) -> Result<Drained> {
    let mut buffer = BytesMut::new();
    let mut chunk_count = 0usize;
    let mut is_binary = false;
    let mut first_value: Option<ProviderOutput> = None;
    let mut first_error: Option<StudioError> = None;

    while let Some(event) = events.next().await {
        match event {
            Ok(StreamEvent::Chunk(chunk)) => {
                is_binary = true;
                chunk_count += 1;
                buffer.extend_from_slice(&chunk);
            }
            Ok(StreamEvent::Value(value)) => {
                if !is_binary && first_value.is_none() {
                    first_value = Some(value);
                } else {
                    log::debug!("Stream event (non-binary or mixed): {:?}", value);
                }
            }
            Err(e) => {
                log::error!("Stream error: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    if is_binary {
        log::info!(
            "Collected {} binary chunks ({} bytes) for image data",
            chunk_count,
            buffer.len()
        );
        if !buffer.is_empty() {
            return Ok(Drained::Binary(buffer.freeze()));
        }
    }

    Ok(first_value.map_or(Drained::Empty, Drained::Value))
}

/// Concatenate a readable byte stream in arrival order.
pub async fn drain_bytes(mut stream: ByteStream) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}
