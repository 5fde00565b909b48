//! CursorCodec: encode/decode with integrity, version, filter, and TTL checks.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};

use steadfast_core::config::CursorConfig;
use steadfast_core::constants::{
    CURSOR_FORMAT_VERSION, CURSOR_KEY_CONTEXT, CURSOR_LEGACY_FORMAT_VERSION, CURSOR_TAG_LEN,
};
use steadfast_core::errors::CursorError;
use steadfast_core::models::Fingerprint;
use steadfast_core::traits::Clock;

use super::state::{CursorState, LegacyBody};

/// Encodes and validates cursors.
///
/// Decoding checks, in order: framing, version, integrity tag, filter
/// fingerprint, age. The first failing check decides the error.
///
/// Both versions carry a keyed tag. Version-1 bodies have no issue time, so
/// they are aged from codec start: they stop decoding one TTL after startup.
pub struct CursorCodec {
    key: [u8; 32],
    ttl: chrono::Duration,
    accept_legacy: bool,
    started_at: DateTime<Utc>,
    clock: Arc<dyn Clock>,
}

impl CursorCodec {
    pub fn new(config: &CursorConfig, clock: Arc<dyn Clock>) -> Self {
        let key = match config.secret {
            Some(ref secret) => blake3::derive_key(CURSOR_KEY_CONTEXT, secret.as_bytes()),
            None => {
                // Per-process key: cursors die with the process.
                let seed = [uuid::Uuid::new_v4().into_bytes(), uuid::Uuid::new_v4().into_bytes()];
                blake3::derive_key(CURSOR_KEY_CONTEXT, &seed.concat())
            }
        };
        Self {
            key,
            ttl: chrono::Duration::from_std(config.effective_ttl())
                .unwrap_or(chrono::Duration::MAX),
            accept_legacy: config.effective_accept_legacy(),
            started_at: clock.now(),
            clock,
        }
    }

    /// Encode `state` in the current format.
    pub fn encode(&self, state: &CursorState) -> Result<String, CursorError> {
        let mut body = serde_json::to_vec(state)
            .map_err(|e| CursorError::malformed(format!("unserializable state: {e}")))?;
        Ok(self.seal(CURSOR_FORMAT_VERSION, &mut body))
    }

    /// Encode `state` in the version-1 layout, as older deployments did.
    pub fn encode_legacy(&self, state: &CursorState) -> Result<String, CursorError> {
        let mut body = serde_json::to_vec(&LegacyBody::from_state(state))
            .map_err(|e| CursorError::malformed(format!("unserializable state: {e}")))?;
        Ok(self.seal(CURSOR_LEGACY_FORMAT_VERSION, &mut body))
    }

    /// Decode `token` for a request whose view fingerprint is `expected_filter`.
    pub fn decode(
        &self,
        token: &str,
        expected_filter: &Fingerprint,
    ) -> Result<CursorState, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| CursorError::malformed(format!("not base64url: {e}")))?;
        if bytes.len() <= 1 + CURSOR_TAG_LEN {
            return Err(CursorError::malformed("cursor is truncated"));
        }

        let (signed, tag) = bytes.split_at(bytes.len() - CURSOR_TAG_LEN);
        let version = signed[0];
        let body = &signed[1..];

        let state = match version {
            CURSOR_FORMAT_VERSION => {
                self.verify(self.keyed_tag(signed), tag)?;
                let state: CursorState = serde_json::from_slice(body)
                    .map_err(|e| CursorError::malformed(format!("bad body: {e}")))?;
                if state.format_version != version {
                    return Err(CursorError::malformed("body version disagrees with header"));
                }
                state
            }
            CURSOR_LEGACY_FORMAT_VERSION if self.accept_legacy => {
                self.verify(self.keyed_tag(signed), tag)?;
                let legacy: LegacyBody = serde_json::from_slice(body)
                    .map_err(|e| CursorError::malformed(format!("bad body: {e}")))?;
                legacy.upgrade(self.started_at)
            }
            other => return Err(CursorError::UnsupportedVersion { version: other }),
        };

        if state.filter_fingerprint != *expected_filter {
            return Err(CursorError::FilterMismatch);
        }
        if self.clock.now() - state.issued_at > self.ttl {
            return Err(CursorError::expired("cursor is older than its time-to-live"));
        }
        Ok(state)
    }

    fn seal(&self, version: u8, body: &mut Vec<u8>) -> String {
        let mut framed = Vec::with_capacity(1 + body.len() + CURSOR_TAG_LEN);
        framed.push(version);
        framed.append(body);
        let tag = self.keyed_tag(&framed);
        framed.extend_from_slice(tag.as_bytes());
        URL_SAFE_NO_PAD.encode(framed)
    }

    fn keyed_tag(&self, signed: &[u8]) -> blake3::Hash {
        blake3::keyed_hash(&self.key, signed)
    }

    fn verify(&self, expected: blake3::Hash, presented: &[u8]) -> Result<(), CursorError> {
        let presented: [u8; CURSOR_TAG_LEN] = presented
            .try_into()
            .map_err(|_| CursorError::malformed("tag has wrong length"))?;
        // `Hash` equality is constant-time.
        if expected != blake3::Hash::from(presented) {
            return Err(CursorError::TagMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::PositionMarker;
    use steadfast_core::traits::ManualClock;

    fn codec(clock: Arc<ManualClock>, accept_legacy: bool) -> CursorCodec {
        let config = CursorConfig {
            secret: Some("0123456789abcdef-test".to_string()),
            ttl_secs: Some(60),
            accept_legacy: Some(accept_legacy),
        };
        CursorCodec::new(&config, clock)
    }

    fn state(clock: &ManualClock) -> CursorState {
        CursorState::new(
            Fingerprint::from_hex("f1"),
            PositionMarker::Offset { offset: 4 },
            clock.now(),
        )
        .with_snapshot("snap-1")
    }

    #[test]
    fn round_trip() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec(clock.clone(), true);
        let original = state(&clock);
        let token = codec.encode(&original).unwrap();
        assert_eq!(codec.decode(&token, &Fingerprint::from_hex("f1")).unwrap(), original);
    }

    #[test]
    fn legacy_cursor_honours_grace_setting() {
        let clock = Arc::new(ManualClock::default());
        let original = state(&clock);
        let token = codec(clock.clone(), true).encode_legacy(&original).unwrap();

        let decoded = codec(clock.clone(), true)
            .decode(&token, &Fingerprint::from_hex("f1"))
            .unwrap();
        assert_eq!(decoded.position, original.position);
        assert_eq!(decoded.snapshot_id, original.snapshot_id);

        let err = codec(clock, false)
            .decode(&token, &Fingerprint::from_hex("f1"))
            .unwrap_err();
        assert_eq!(err, CursorError::UnsupportedVersion { version: 1 });
    }

    #[test]
    fn legacy_cursor_expires_one_ttl_after_startup() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec(clock.clone(), true);
        let fp = Fingerprint::from_hex("f1");
        let token = codec.encode_legacy(&state(&clock)).unwrap();

        clock.advance(chrono::Duration::seconds(59));
        assert!(codec.decode(&token, &fp).is_ok());
        clock.advance(chrono::Duration::seconds(2));
        assert!(matches!(codec.decode(&token, &fp), Err(CursorError::Expired { .. })));
    }

    #[test]
    fn rechecksummed_legacy_forgery_fails_integrity() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec(clock.clone(), true);
        let body = serde_json::to_vec(&LegacyBody::from_state(&state(&clock))).unwrap();
        let mut framed = vec![CURSOR_LEGACY_FORMAT_VERSION];
        framed.extend_from_slice(&body);
        let digest = blake3::hash(&framed);
        framed.extend_from_slice(digest.as_bytes());
        let forged = URL_SAFE_NO_PAD.encode(framed);

        assert_eq!(
            codec.decode(&forged, &Fingerprint::from_hex("f1")).unwrap_err(),
            CursorError::TagMismatch
        );
    }

    #[test]
    fn other_secret_fails_integrity() {
        let clock = Arc::new(ManualClock::default());
        let token = codec(clock.clone(), true).encode(&state(&clock)).unwrap();
        let other = CursorCodec::new(&CursorConfig::default(), clock);
        assert_eq!(
            other.decode(&token, &Fingerprint::from_hex("f1")).unwrap_err(),
            CursorError::TagMismatch
        );
    }

    #[test]
    fn truncated_and_garbage_are_malformed() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec(clock, true);
        let fp = Fingerprint::from_hex("f1");
        assert!(matches!(codec.decode("%%%", &fp), Err(CursorError::Malformed { .. })));
        assert!(matches!(codec.decode("AQ", &fp), Err(CursorError::Malformed { .. })));
    }
}
