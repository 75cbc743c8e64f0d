//! Ordered action execution against one buffered reply.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::instruction::codec::Action;

/// Apply an ordered action list to a buffered reply.
///
/// Maintains a cursor from offset 0. Delays suspend only the calling task.
/// `SendBytes` is clamped to the remaining length. If no send action ran
/// at all, the full buffer is flushed once after the list completes so a
/// delay-only instruction never silently drops the reply; bytes a send
/// action chose not to emit stay withheld.
///
/// A write failure aborts the exchange and surfaces to the caller.
pub async fn apply<W>(reply: &[u8], dst: &mut W, actions: &[Action]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut cursor = 0;
    let mut sent = false;

    for action in actions {
        match *action {
            Action::Delay(ms) => {
                tracing::debug!(delay_ms = ms, "delaying before next action");
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            Action::SendBytes(n) => {
                let end = (cursor + n).min(reply.len());
                tracing::debug!(count = end - cursor, offset = cursor, "sending partial reply");
                dst.write_all(&reply[cursor..end]).await?;
                cursor = end;
                sent = true;
            }
            Action::SendAll => {
                tracing::debug!(offset = cursor, "sending remainder of reply");
                dst.write_all(&reply[cursor..]).await?;
                cursor = reply.len();
                sent = true;
            }
        }
    }

    if cursor < reply.len() && !sent {
        dst.write_all(&reply[cursor..]).await?;
    }
    dst.flush().await?;
    Ok(())
}
