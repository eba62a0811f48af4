//! Lazy chunking from an async byte source
//!
//! A single-producer pipeline: one background task reads from the source,
//! frames complete chunks, and hands them to the consumer over a bounded
//! channel. I/O failures travel out-of-band on a oneshot error channel so
//! the chunk stream itself stays a plain sequence of [`MediaChunk`]s.

use crate::codec::{self, BYTES_PER_SAMPLE};
use crate::error::AudioError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use voxstream_core::MediaChunk;

const READ_BUF_SIZE: usize = 8 * 1024;
const CHANNEL_CAPACITY: usize = 4;

/// Spawn a lazy chunking pipeline over `reader`.
///
/// Returns the chunk receiver and an error receiver. Exactly one chunk
/// carries `is_last`: end-of-stream from the source marks the trailing
/// partial or full chunk. Cancellation is honored between chunks; a
/// canceled pipeline stops emitting and surfaces [`AudioError::Canceled`]
/// on the error channel.
pub fn stream_from_reader<R>(
    reader: R,
    chunk_size: usize,
    cancel: CancellationToken,
) -> Result<(mpsc::Receiver<MediaChunk>, oneshot::Receiver<AudioError>), AudioError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    codec::validate(&voxstream_core::StreamingMediaConfig::pcm_linear16().with_chunk_size(chunk_size))?;

    let (chunk_tx, chunk_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (error_tx, error_rx) = oneshot::channel();

    tokio::spawn(pump(reader, chunk_size, cancel, chunk_tx, error_tx));

    Ok((chunk_rx, error_rx))
}

async fn pump<R>(
    mut reader: R,
    chunk_size: usize,
    cancel: CancellationToken,
    chunk_tx: mpsc::Sender<MediaChunk>,
    error_tx: oneshot::Sender<AudioError>,
) where
    R: AsyncRead + Unpin,
{
    let mut sequence: u64 = 0;
    let mut buf: Vec<u8> = Vec::with_capacity(chunk_size);
    // A filled chunk is held back until its successor (or EOF) arrives, so
    // the final chunk always carries the last marker.
    let mut ready: Option<Vec<u8>> = None;
    let mut tmp = vec![0u8; READ_BUF_SIZE];

    loop {
        if cancel.is_cancelled() {
            let _ = error_tx.send(AudioError::Canceled);
            return;
        }

        let n = match reader.read(&mut tmp).await {
            Ok(n) => n,
            Err(err) => {
                let _ = error_tx.send(err.into());
                return;
            }
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);

        while buf.len() >= chunk_size {
            let piece: Vec<u8> = buf.drain(..chunk_size).collect();
            if let Some(prev) = ready.take()
                && !emit(&chunk_tx, &mut sequence, prev, false).await
            {
                return;
            }
            ready = Some(piece);
            if cancel.is_cancelled() {
                let _ = error_tx.send(AudioError::Canceled);
                return;
            }
        }
    }

    // End of stream: flush what is buffered, marking the trailing chunk.
    if buf.is_empty() {
        match ready.take() {
            Some(prev) => {
                emit(&chunk_tx, &mut sequence, prev, true).await;
            }
            None => {
                let _ = error_tx.send(AudioError::EmptyAudio);
            }
        }
        return;
    }

    if buf.len() % BYTES_PER_SAMPLE != 0 {
        if let Some(prev) = ready.take() {
            emit(&chunk_tx, &mut sequence, prev, false).await;
        }
        let _ = error_tx.send(AudioError::Misaligned {
            len: buf.len(),
            bytes_per_sample: BYTES_PER_SAMPLE,
        });
        return;
    }

    if let Some(prev) = ready.take()
        && !emit(&chunk_tx, &mut sequence, prev, false).await
    {
        return;
    }
    emit(&chunk_tx, &mut sequence, buf, true).await;
}

/// Returns false when the consumer dropped the receiver.
async fn emit(
    chunk_tx: &mpsc::Sender<MediaChunk>,
    sequence: &mut u64,
    payload: Vec<u8>,
    is_last: bool,
) -> bool {
    let chunk = codec::build_chunk(payload, *sequence, is_last);
    *sequence += 1;
    if chunk_tx.send(chunk).await.is_err() {
        tracing::debug!("chunk consumer dropped, stopping reader pipeline");
        return false;
    }
    true
}
