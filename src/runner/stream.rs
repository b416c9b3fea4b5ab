//! Output stream pumps feeding the classified event channel.
//!
//! Subprocess output arrives in reads that are neither line- nor
//! character-aligned: a multibyte character can straddle two reads. The
//! stdout pump therefore carries incomplete trailing UTF-8 bytes over to
//! the next read, so the demultiplexer only ever sees whole characters
//! and a chunk-split payload reconstructs exactly.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;

use crate::runner::{ClassifiedEvent, OutputDemultiplexer};

/// Default buffer for the classified event channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Read size for subprocess output.
const READ_CHUNK: usize = 4096;

/// Wire a stdout-style stream through a demultiplexer into a fresh event
/// channel. Events arrive in stream order; the channel closes when the
/// stream ends.
pub fn into_channel<R>(
    reader: R,
    demux: OutputDemultiplexer,
    buffer: usize,
) -> Receiver<ClassifiedEvent>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(buffer);
    tokio::spawn(pump_stdout(reader, tx, demux, CancellationToken::new()));
    rx
}

/// Pump stdout chunks through the demultiplexer into the event channel.
pub async fn pump_stdout<R>(
    mut reader: R,
    tx: Sender<ClassifiedEvent>,
    mut demux: OutputDemultiplexer,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin + Send,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                // Buffered partial payload is discarded, never flushed
                demux.reset();
                return;
            }
            read = reader.read(&mut buf) => {
                match read {
                    Ok(0) => {
                        // Flush any dangling bytes the stream never completed
                        if !pending.is_empty() {
                            let tail = String::from_utf8_lossy(&pending).into_owned();
                            if let Some(event) = demux.classify(&tail) {
                                let _ = tx.send(event).await;
                            }
                        }
                        return;
                    }
                    Ok(n) => {
                        pending.extend_from_slice(&buf[..n]);
                        let chunk = take_complete_utf8(&mut pending);
                        if chunk.is_empty() {
                            continue;
                        }
                        if let Some(event) = demux.classify(&chunk) {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let event =
                            ClassifiedEvent::NonFatalError(format!("stdout read failed: {e}"));
                        let _ = tx.send(event).await;
                        return;
                    }
                }
            }
        }
    }
}

/// Pump stderr chunks verbatim into the event channel.
pub async fn pump_stderr<R>(mut reader: R, tx: Sender<ClassifiedEvent>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin + Send,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => return,
            read = reader.read(&mut buf) => {
                match read {
                    Ok(0) => return,
                    Ok(n) => {
                        let event = OutputDemultiplexer::classify_stderr(&buf[..n]);
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let event =
                            ClassifiedEvent::NonFatalError(format!("stderr read failed: {e}"));
                        let _ = tx.send(event).await;
                        return;
                    }
                }
            }
        }
    }
}

/// Split off the longest complete-UTF-8 prefix of `pending` as a string,
/// leaving an incomplete trailing character (at most 3 bytes) behind for
/// the next read.
fn take_complete_utf8(pending: &mut Vec<u8>) -> String {
    let boundary = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        // error_len is None only when valid text ends in a truncated
        // character; anything else is genuinely invalid and decoded
        // lossily rather than held forever
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let rest = pending.split_off(boundary);
    let complete = std::mem::replace(pending, rest);
    String::from_utf8_lossy(&complete).into_owned()
}
