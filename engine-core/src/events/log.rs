//! Append-only event log: a stable binary record format, batched writes,
//! optional fsync, and crash recovery by sequential replay with CRC and
//! sequence-gap validation.
//!
//! Record framing: `[u64 seq LE][u8 kind][u32 len LE][payload bytes][u32 crc32(payload) LE]`.
//! The CRC covers only the payload; header corruption is not separately
//! protected, matching the format this crate commits to on disk.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crc32fast::Hasher;
use tracing::{info, warn};

use crate::error::LogError;
use crate::events::types::{Event, EventBody, EventKind};
use crate::types::SequenceNum;

const HEADER_LEN: usize = 8 + 1 + 4;
const CRC_LEN: usize = 4;

fn encode_record(event: &Event) -> Result<Vec<u8>, LogError> {
    let payload = bincode::serialize(&event.body)?;
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + CRC_LEN);
    buf.extend_from_slice(&event.sequence_num.to_le_bytes());
    buf.push(event.kind() as u8);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&payload);
    let mut hasher = Hasher::new();
    hasher.update(&payload);
    buf.extend_from_slice(&hasher.finalize().to_le_bytes());
    Ok(buf)
}

/// An open handle to the log file, ready to append further batches.
pub struct EventLog {
    writer: BufWriter<File>,
    fsync_on_flush: bool,
}

impl EventLog {
    /// Opens `path` for appending, creating it if absent. Does not perform
    /// recovery; call `recover` first if the file may contain prior records.
    pub fn open_for_append(path: &Path, fsync_on_flush: bool) -> Result<Self, LogError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(EventLog {
            writer: BufWriter::new(file),
            fsync_on_flush,
        })
    }

    /// Serializes and writes every event in `batch`, in order. Does not
    /// fsync; call `flush` to force the OS buffer and, if configured, fsync.
    pub fn write_batch(&mut self, batch: &[Event]) -> Result<(), LogError> {
        for event in batch {
            let record = encode_record(event)?;
            self.writer.write_all(&record)?;
        }
        Ok(())
    }

    /// Flushes the internal buffer to the OS and, if configured, fsyncs.
    pub fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        if self.fsync_on_flush {
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }
}

/// The result of a successful recovery scan: every well-formed event found,
/// in order, and the sequence number the engine should resume assigning
/// from (one past the last event's sequence number, or 1 if the log was
/// empty).
pub struct RecoveredLog {
    pub events: Vec<Event>,
    pub resume_sequence: SequenceNum,
}

/// Reads every record in `path`, truncating a torn or bad-CRC trailing
/// record, and returns the well-formed prefix. A checksum mismatch or
/// sequence gap that is not explainable as a truncated tail is a hard
/// error: recovery does not guess at which side of the corruption to trust.
pub fn recover(path: &Path) -> Result<RecoveredLog, LogError> {
    if !path.exists() {
        return Ok(RecoveredLog { events: Vec::new(), resume_sequence: 1 });
    }

    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let mut events = Vec::new();
    let mut offset = 0usize;
    let mut expected_seq: SequenceNum = 1;
    let mut valid_end = 0usize;

    loop {
        if bytes.len() - offset < HEADER_LEN {
            break; // torn header: truncate from `offset`.
        }
        let seq = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        let kind_tag = bytes[offset + 8];
        let len = u32::from_le_bytes(bytes[offset + 9..offset + 13].try_into().unwrap()) as usize;

        let record_end = offset + HEADER_LEN + len + CRC_LEN;
        if record_end > bytes.len() {
            break; // torn payload/crc: truncate from `offset`.
        }

        let payload = &bytes[offset + HEADER_LEN..offset + HEADER_LEN + len];
        let stored_crc = u32::from_le_bytes(
            bytes[offset + HEADER_LEN + len..record_end].try_into().unwrap(),
        );
        let mut hasher = Hasher::new();
        hasher.update(payload);
        let computed_crc = hasher.finalize();

        if computed_crc != stored_crc {
            if record_end == bytes.len() {
                // Bad CRC on the last record in the file: treat as torn.
                warn!(offset, "trailing record failed checksum, truncating");
                break;
            }
            return Err(LogError::ChecksumMismatch { offset: offset as u64 });
        }

        if seq != expected_seq {
            return Err(LogError::SequenceGap { expected: expected_seq, found: seq });
        }

        if EventKind::from_u8(kind_tag).is_none() {
            warn!(offset, kind_tag, "unrecognized event kind tag in log record");
        }

        let body: EventBody = bincode::deserialize(payload)?;
        events.push(Event::new(seq, body));
        expected_seq += 1;
        offset = record_end;
        valid_end = record_end;
    }

    if valid_end < bytes.len() {
        info!(
            kept = valid_end,
            total = bytes.len(),
            "truncating torn trailing record on recovery"
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(valid_end as u64)?;
    }

    Ok(RecoveredLog { events, resume_sequence: expected_seq })
}
