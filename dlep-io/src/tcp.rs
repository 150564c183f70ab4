//! Drives one `dlep_session::Session` over a connected TCP stream (§4.9):
//! reads bytes, feeds them to the session, flushes whatever the session
//! queued in response, and polls the session's timers whenever nothing
//! arrives before `Session::next_wake`. Mirrors the shape of
//! `edge_dhcp::io::client::Lease::request`'s `select(read, Timer::after(..))`
//! loop, but keyed off the session's own computed deadline rather than a
//! single fixed timeout.

use core::time::Duration;
use std::time::Instant;

use embedded_io_async::{Read, Write};

use dlep_session::Session;

use crate::error::Error;

/// Read buffer large enough for a handful of in-flight signals; grown by
/// compaction rather than reallocation (§5: "reused across signals on the
/// same session").
const BUF_LEN: usize = 4096;
/// Upper bound used when a session has nothing scheduled (post-teardown,
/// or `Active` with no pending timer) so the loop still wakes up
/// periodically rather than blocking forever.
const IDLE_POLL: Duration = Duration::from_secs(3600);

/// Runs `session` to completion (until it destroys itself) over `socket`,
/// flushing the session's transmit buffer after every inbound signal and
/// every timer tick (§5, §6: "the transmit buffer written by one session is
/// flushed as one ... TCP write").
///
/// `epoch` anchors the `Duration`s `Session` works in (§4.4: "a monotonic
/// `now` supplied by the caller") to wall-clock time; callers share one
/// `epoch` across every session on a host so deadlines compare sensibly in
/// logs.
pub async fn run_session<S>(socket: &mut S, session: &mut Session, epoch: Instant) -> Result<(), Error<S::Error>>
where
    S: Read + Write,
{
    let mut buf = vec![0u8; BUF_LEN];
    let mut held = 0usize;

    flush(socket, session).await?;

    loop {
        if session.is_destroyed() {
            return Ok(());
        }

        let now = epoch.elapsed();
        let wait = match session.next_wake() {
            Some(deadline) if deadline > now => deadline - now,
            Some(_) => Duration::from_millis(0),
            None => IDLE_POLL,
        };

        tokio::select! {
            res = socket.read(&mut buf[held..]) => {
                let n = res.map_err(Error::Io)?;
                if n == 0 {
                    return Err(Error::Closed);
                }
                held += n;

                let consumed = session.feed(&buf[..held], epoch.elapsed());
                if consumed > 0 {
                    buf.copy_within(consumed..held, 0);
                    held -= consumed;
                }

                flush(socket, session).await?;
            }
            _ = tokio::time::sleep(wait) => {
                session.poll_timers(epoch.elapsed());
                flush(socket, session).await?;
            }
        }
    }
}

async fn flush<S>(socket: &mut S, session: &mut Session) -> Result<(), Error<S::Error>>
where
    S: Write,
{
    if session.has_outbox() {
        let bytes = session.take_outbox();
        socket.write_all(&bytes).await.map_err(Error::Io)?;
    }
    Ok(())
}
