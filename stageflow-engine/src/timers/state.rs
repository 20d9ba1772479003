//! Versioned, checksummed encoding of timer state.
//!
//! The encoded form is `sft<version>.<payload>.<checksum>` where `payload`
//! is URL-safe base64 of a JSON document and `checksum` is the first 8
//! bytes of the payload's SHA-256, hex encoded. Callers treat the string as
//! opaque.

use super::TimerRecord;
use crate::errors::TimerError;
use crate::utils::iso_timestamp;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

/// Format version written by this build.
pub const TIMER_STATE_VERSION: u32 = 1;

const PREFIX: &str = "sft";

/// One timer as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedTimer {
    /// Timer id.
    pub id: String,
    /// Owning stage.
    pub stage: String,
    /// Target stage.
    pub target: String,
    /// Index of the originating transition within the owning stage.
    pub transition_index: usize,
    /// Configured delay in milliseconds.
    pub duration_ms: u64,
    /// Time left in milliseconds at serialization.
    pub remaining_ms: u64,
    /// Whether the timer was paused.
    pub paused: bool,
    /// Arbitrary annotations.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl SerializedTimer {
    fn from_record(record: &TimerRecord, now: Instant) -> Self {
        Self {
            id: record.id.clone(),
            stage: record.stage.clone(),
            target: record.target.clone(),
            transition_index: record.transition_index,
            duration_ms: duration_ms(record.duration),
            remaining_ms: duration_ms(record.remaining_at(now)),
            paused: record.paused,
            metadata: record.metadata.clone(),
        }
    }

    /// Rebuilds a live record relative to `now`.
    #[must_use]
    pub fn into_record(self, now: Instant) -> TimerRecord {
        let remaining = Duration::from_millis(self.remaining_ms);
        TimerRecord {
            id: self.id,
            stage: self.stage,
            target: self.target,
            transition_index: self.transition_index,
            duration: Duration::from_millis(self.duration_ms),
            scheduled_at: now + remaining,
            paused: self.paused,
            remaining: self.paused.then_some(remaining),
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TimerStateDocument {
    version: u32,
    saved_at: String,
    timers: Vec<SerializedTimer>,
}

/// Encodes `records` as seen at `now`.
///
/// # Errors
///
/// Returns `TimerError::MalformedState` if JSON encoding fails.
pub fn encode(records: &[TimerRecord], now: Instant) -> Result<String, TimerError> {
    let document = TimerStateDocument {
        version: TIMER_STATE_VERSION,
        saved_at: iso_timestamp(),
        timers: records
            .iter()
            .map(|r| SerializedTimer::from_record(r, now))
            .collect(),
    };
    let json = serde_json::to_vec(&document).map_err(|e| TimerError::MalformedState(e.to_string()))?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let checksum = checksum(&payload);
    Ok(format!("{PREFIX}{TIMER_STATE_VERSION}.{payload}.{checksum}"))
}

/// Decodes and structurally validates an encoded timer state.
///
/// # Errors
///
/// Returns `UnsupportedVersion` for another format version and
/// `MalformedState` for anything that does not decode, fails its checksum,
/// repeats an id, or has more time remaining than its duration.
pub fn decode(input: &str) -> Result<Vec<SerializedTimer>, TimerError> {
    let mut parts = input.trim().split('.');
    let (Some(header), Some(payload), Some(sum), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed("expected three dot-separated sections"));
    };

    let version: u32 = header
        .strip_prefix(PREFIX)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| malformed("missing version header"))?;
    if version != TIMER_STATE_VERSION {
        return Err(TimerError::UnsupportedVersion {
            found: version,
            expected: TIMER_STATE_VERSION,
        });
    }

    if checksum(payload) != sum {
        return Err(malformed("checksum mismatch"));
    }

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| malformed(&format!("invalid base64: {e}")))?;
    let document: TimerStateDocument =
        serde_json::from_slice(&json).map_err(|e| malformed(&format!("invalid document: {e}")))?;

    if document.version != TIMER_STATE_VERSION {
        return Err(TimerError::UnsupportedVersion {
            found: document.version,
            expected: TIMER_STATE_VERSION,
        });
    }

    let mut ids = HashSet::new();
    for timer in &document.timers {
        if timer.id.is_empty() {
            return Err(malformed("timer with empty id"));
        }
        if !ids.insert(timer.id.as_str()) {
            return Err(malformed(&format!("duplicate timer id '{}'", timer.id)));
        }
        if timer.remaining_ms > timer.duration_ms {
            return Err(malformed(&format!(
                "timer '{}' has more time remaining than its duration",
                timer.id
            )));
        }
    }

    Ok(document.timers)
}

fn checksum(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

fn malformed(detail: &str) -> TimerError {
    TimerError::MalformedState(detail.to_string())
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: &str, now: Instant) -> TimerRecord {
        TimerRecord::new(id, "loading", "main", 1, Duration::from_secs(3), now)
    }

    #[test]
    fn test_encode_decode_preserves_timers() {
        let now = Instant::now();
        let mut paused = record("b", now);
        paused.pause_at(now + Duration::from_secs(1));

        let encoded = encode(&[record("a", now), paused], now + Duration::from_secs(1)).unwrap();
        assert!(encoded.starts_with("sft1."));

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].id, "a");
        assert_eq!(decoded[0].remaining_ms, 2000);
        assert!(!decoded[0].paused);
        assert_eq!(decoded[1].remaining_ms, 2000);
        assert!(decoded[1].paused);
        assert_eq!(decoded[1].duration_ms, 3000);
    }

    #[test]
    fn test_into_record() {
        let now = Instant::now();
        let timer = SerializedTimer {
            id: "t".to_string(),
            stage: "loading".to_string(),
            target: "main".to_string(),
            transition_index: 0,
            duration_ms: 3000,
            remaining_ms: 1200,
            paused: true,
            metadata: HashMap::new(),
        };
        let record = timer.into_record(now);
        assert_eq!(record.remaining, Some(Duration::from_millis(1200)));
        assert_eq!(record.remaining_at(now), Duration::from_millis(1200));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let encoded = encode(&[record("a", Instant::now())], Instant::now()).unwrap();
        let mut sections: Vec<&str> = encoded.split('.').collect();
        let tampered_payload = format!("{}A", sections[1]);
        sections[1] = &tampered_payload;
        let tampered = sections.join(".");

        assert!(matches!(decode(&tampered), Err(TimerError::MalformedState(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(decode("not timer state"), Err(TimerError::MalformedState(_))));
        assert!(matches!(decode(""), Err(TimerError::MalformedState(_))));
    }

    #[test]
    fn test_future_version_rejected() {
        let encoded = encode(&[], Instant::now()).unwrap();
        let bumped = encoded.replacen("sft1.", "sft2.", 1);
        assert_eq!(
            decode(&bumped),
            Err(TimerError::UnsupportedVersion { found: 2, expected: 1 })
        );
    }

    #[test]
    fn test_remaining_beyond_duration_rejected() {
        let document = TimerStateDocument {
            version: 1,
            saved_at: iso_timestamp(),
            timers: vec![SerializedTimer {
                id: "t".to_string(),
                stage: "loading".to_string(),
                target: "main".to_string(),
                transition_index: 0,
                duration_ms: 100,
                remaining_ms: 500,
                paused: false,
                metadata: HashMap::new(),
            }],
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&document).unwrap());
        let encoded = format!("sft1.{payload}.{}", checksum(&payload));

        assert!(matches!(decode(&encoded), Err(TimerError::MalformedState(_))));
    }
}
