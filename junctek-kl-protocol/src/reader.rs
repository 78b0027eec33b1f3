use embedded_io::{Read, ReadReady};
use log::{trace, warn};

use crate::Error;
use crate::clock::Clock;
use crate::frame::Line;

/// Progress towards the CR LF terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Reading,
    Cr,
    CrLf,
}

/// Read one CR LF terminated line
///
/// Polls `reader` byte by byte. Returns [Error::Timeout] when no byte at all
/// arrives within `timeout_ms`. Once the first byte is in, the read continues
/// until the terminator; a line longer than [crate::MAX_LINE_LEN] or the end of
/// the stream yields [Error::InvalidInput].
///
/// Waiting is a busy loop around [core::hint::spin_loop]: the calling thread
/// keeps the CPU fully occupied for up to `timeout_ms` while no byte is
/// available.
pub fn read_line<R: Read + ReadReady, C: Clock>(
    reader: &mut R,
    clock: &C,
    timeout_ms: u32,
) -> Result<Line, Error<R::Error>> {
    let mut line = Line::new();
    let mut state = LineState::Reading;
    let start = clock.now_ms();

    while state != LineState::CrLf {
        if !reader.read_ready()? {
            if line.is_empty() && clock.elapsed_ms(start) >= timeout_ms {
                warn!("No response within {timeout_ms}ms");
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
            continue;
        }

        let mut byte = [0u8; 1];
        if reader.read(&mut byte)? == 0 {
            warn!("Stream ended after {} bytes", line.len());
            return Err(Error::InvalidInput);
        }
        if line.push(byte[0]).is_err() {
            warn!("Line exceeds {} bytes: {line}", line.len());
            return Err(Error::InvalidInput);
        }

        state = match (state, byte[0]) {
            (_, b'\r') => LineState::Cr,
            (LineState::Cr, b'\n') => LineState::CrLf,
            _ => LineState::Reading,
        };
    }

    trace!("Received {line}");
    Ok(line)
}

/// Drop whatever is waiting on `reader`
///
/// Returns the number of discarded bytes.
pub fn discard_pending<R: Read + ReadReady>(reader: &mut R) -> Result<usize, R::Error> {
    let mut discarded = 0;
    let mut byte = [0u8; 1];
    while reader.read_ready()? {
        if reader.read(&mut byte)? == 0 {
            break;
        }
        discarded += 1;
    }
    if discarded > 0 {
        trace!("Discarded {discarded} stale bytes");
    }
    Ok(discarded)
}
