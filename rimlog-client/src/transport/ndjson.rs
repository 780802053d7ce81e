//! Decoding of newline-delimited JSON subscribe bodies.

use super::RecordStream;
use crate::error::{Result, RimlogError};
use crate::types::CommittedRecord;
use crate::types::wire::SubscribeFrame;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

/// Longest subscribe line accepted before the stream is treated as broken.
pub const MAX_LINE_BYTES: usize = 1 << 20;

struct DecodeState<S> {
    body: Pin<Box<S>>,
    buffer: BytesMut,
    // Prefix of `buffer` already known to hold no newline.
    scanned: usize,
    max_line: usize,
    finished: bool,
    address: String,
}

impl<S> DecodeState<S> {
    fn next_buffered(&mut self) -> Result<Option<CommittedRecord>> {
        loop {
            let newline = self.buffer[self.scanned..]
                .iter()
                .position(|byte| *byte == b'\n')
                .map(|offset| self.scanned + offset);

            let line_len = newline.unwrap_or(self.buffer.len());
            if line_len > self.max_line {
                return Err(RimlogError::transport(
                    self.address.clone(),
                    format!("subscribe line exceeds {} bytes", self.max_line),
                ));
            }

            let raw = match newline {
                Some(pos) => self.buffer.split_to(pos + 1),
                None if self.finished && !self.buffer.is_empty() => self.buffer.split(),
                None => {
                    self.scanned = self.buffer.len();
                    return Ok(None);
                }
            };
            self.scanned = 0;

            let line = raw.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let frame: SubscribeFrame = serde_json::from_slice(line)?;
            return Ok(Some(frame.into()));
        }
    }
}

async fn next_record<S, E>(state: &mut DecodeState<S>) -> Result<Option<CommittedRecord>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    loop {
        if let Some(record) = state.next_buffered()? {
            return Ok(Some(record));
        }

        if state.finished {
            return Ok(None);
        }

        match state.body.next().await {
            Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
            Some(Err(error)) => {
                return Err(RimlogError::transport(
                    state.address.clone(),
                    format!("subscribe stream broken: {}", error),
                ));
            }
            None => state.finished = true,
        }
    }
}

/// Turns a chunked NDJSON body into a stream of committed records.
///
/// Chunk boundaries need not align with lines. Blank lines are skipped and a
/// final line without a trailing newline is still decoded. A line longer
/// than [`MAX_LINE_BYTES`] ends the stream with a transport error.
pub fn decode_records<S, E>(address: impl Into<String>, body: S) -> RecordStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    decode_records_with_limit(address, body, MAX_LINE_BYTES)
}

pub(crate) fn decode_records_with_limit<S, E>(
    address: impl Into<String>,
    body: S,
    max_line: usize,
) -> RecordStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        buffer: BytesMut::new(),
        scanned: 0,
        max_line,
        finished: false,
        address: address.into(),
    };

    stream::try_unfold(state, |mut state| async move {
        next_record(&mut state)
            .await
            .map(|next| next.map(|record| (record, state)))
    })
    .boxed()
}
