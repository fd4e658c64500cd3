//! Async stream adapter for fixed-size chunking.
//!
//! Uses `futures_io::AsyncRead`, so it works with tokio, async-std, smol or
//! any other futures-compatible runtime.

use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::BytesMut;
use futures_core::Stream;
use futures_io::AsyncRead;
use pin_project_lite::pin_project;

use crate::chunk::Chunk;
use crate::chunker::Chunker;
use crate::error::DigestError;

pin_project! {
    /// A stream that yields numbered fixed-size blocks from an async reader.
    ///
    /// Yields the same blocks, with the same sequence numbers, as
    /// [`Chunker::chunk`] over the same bytes.
    pub struct BlockStream<R> {
        #[pin]
        reader: R,
        block_size: usize,
        block: BytesMut,
        filled: usize,
        sequence: u64,
        offset: u64,
        finished: bool,
    }
}

impl<R> BlockStream<R> {
    fn new(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            block_size,
            block: BytesMut::new(),
            filled: 0,
            sequence: 0,
            offset: 0,
            finished: false,
        }
    }
}

impl<R: AsyncRead> Stream for BlockStream<R> {
    type Item = Result<Chunk, DigestError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.finished {
                return Poll::Ready(None);
            }

            if this.block.is_empty() {
                *this.block = BytesMut::zeroed(*this.block_size);
            }

            let buf = &mut this.block[*this.filled..];
            let n = match this.reader.as_mut().poll_read(cx, buf) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Poll::Ready(Err(e)) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(DigestError::Read(e))));
                }
                Poll::Ready(Ok(n)) => n,
            };

            if n == 0 {
                *this.finished = true;
                if *this.filled == 0 {
                    return Poll::Ready(None);
                }
            } else {
                *this.filled += n;
                if *this.filled < *this.block_size {
                    continue;
                }
            }

            let mut block = mem::take(this.block);
            block.truncate(mem::take(this.filled));
            let chunk = Chunk::new(*this.sequence, *this.offset, block.freeze());
            *this.sequence += 1;
            *this.offset += chunk.len() as u64;
            return Poll::Ready(Some(Ok(chunk)));
        }
    }
}

/// Creates a block stream from an async reader.
///
/// For tokio readers, convert with `tokio_util::compat`:
///
/// ```ignore
/// use tokio_util::compat::TokioAsyncReadCompatExt;
/// use blocksum::{chunk_async, Chunker};
///
/// let file = tokio::fs::File::open("data.bin").await?;
/// let stream = chunk_async(file.compat(), Chunker::new(1 << 20)?);
/// ```
pub fn chunk_async<R: AsyncRead>(reader: R, chunker: Chunker) -> BlockStream<R> {
    BlockStream::new(reader, chunker.block_size())
}
