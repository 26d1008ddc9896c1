//! Single-line text encoding of a match's shared state.
//!
//! The format is `lane:v1:<columns>x<rows>:<payload>` where the payload is the
//! unpadded base64 of the JSON-serialised [`SharedState`].

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use lane_defence_core::{ParticipantId, SharedState, StatePatch, Version, Versioned};
use thiserror::Error;

const SNAPSHOT_DOMAIN: &str = "lane";
const SNAPSHOT_VERSION: &str = "v1";
const FIELD_DELIMITER: char = ':';

/// Shared state captured together with the board dimensions it was played on.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TransferSnapshot {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) state: SharedState,
}

impl TransferSnapshot {
    /// Encodes the snapshot into a single line.
    pub(crate) fn encode(&self) -> Result<String, TransferError> {
        let json = serde_json::to_vec(&self.state).map_err(TransferError::Serialize)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_DOMAIN}:{SNAPSHOT_VERSION}:{}x{}:{encoded}",
            self.columns, self.rows
        ))
    }

    /// Decodes a snapshot from its single-line representation.
    pub(crate) fn decode(value: &str) -> Result<Self, TransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(TransferError::MissingPrefix)?;
        let version = parts.next().ok_or(TransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(TransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(TransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(TransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(TransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(TransferError::InvalidEncoding)?;
        let state = serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

        Ok(Self {
            columns,
            rows,
            state,
        })
    }

    /// Turns the snapshot into a store write that supersedes a blank room.
    pub(crate) fn into_patch(self, writer: &ParticipantId) -> StatePatch {
        let version = Version::default().successor(writer);
        let state = self.state;
        StatePatch {
            towers: Some(Versioned::new(version.clone(), state.towers)),
            enemies: Some(Versioned::new(version.clone(), state.enemies)),
            ledger: Some(Versioned::new(version.clone(), state.ledger)),
            progress: Some(Versioned::new(version, state.progress)),
        }
    }
}

/// Errors that can occur while encoding or decoding transfer strings.
#[derive(Debug, Error)]
pub(crate) enum TransferError {
    #[error("snapshot string was empty")]
    EmptyPayload,
    #[error("snapshot string is missing the prefix")]
    MissingPrefix,
    #[error("snapshot string is missing the version")]
    MissingVersion,
    #[error("snapshot string is missing the grid dimensions")]
    MissingDimensions,
    #[error("snapshot string is missing the payload")]
    MissingPayload,
    #[error("snapshot prefix '{0}' is not supported")]
    InvalidPrefix(String),
    #[error("snapshot version '{0}' is not supported")]
    UnsupportedVersion(String),
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    #[error("could not decode snapshot payload")]
    InvalidEncoding(#[source] base64::DecodeError),
    #[error("could not parse snapshot payload")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("could not serialise snapshot")]
    Serialize(#[source] serde_json::Error),
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), TransferError> {
    let invalid = || TransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;
    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;
    if columns == 0 || rows == 0 {
        return Err(invalid());
    }
    Ok((columns, rows))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lane_defence_core::{
        CellCoord, GameStatus, LedgerSnapshot, ProgressSnapshot, TowerId, TowerKind,
        TowerSnapshot,
    };

    use super::*;

    fn populated() -> TransferSnapshot {
        let owner = ParticipantId::new("ana");
        let mut ledger = LedgerSnapshot {
            resources: 35,
            base_health: 18,
            ..LedgerSnapshot::default()
        };
        let _ = ledger.scores.insert(owner.clone(), 30);
        TransferSnapshot {
            columns: 12,
            rows: 8,
            state: SharedState {
                towers: vec![TowerSnapshot {
                    id: TowerId::new(0),
                    cell: CellCoord::new(5, 2),
                    kind: TowerKind::Heavy,
                    level: 2,
                    range: 198.0,
                    damage: 45.0,
                    fire_rate: 0.6,
                    last_fired_at: Some(Duration::from_millis(2_500)),
                    owner,
                }],
                enemies: Vec::new(),
                ledger,
                progress: ProgressSnapshot {
                    wave: 2,
                    status: GameStatus::Waiting,
                },
            },
        }
    }

    #[test]
    fn populated_state_survives_transfer() {
        let snapshot = populated();

        let encoded = snapshot.encode().expect("encodes");
        assert!(encoded.starts_with("lane:v1:12x8:"));
        assert!(!encoded.contains('\n'));

        let decoded = TransferSnapshot::decode(&format!("  {encoded}\n")).expect("decodes");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert!(matches!(
            TransferSnapshot::decode("   "),
            Err(TransferError::EmptyPayload)
        ));
        assert!(matches!(
            TransferSnapshot::decode("tile:v1:3x3:e30"),
            Err(TransferError::InvalidPrefix(prefix)) if prefix == "tile"
        ));
        assert!(matches!(
            TransferSnapshot::decode("lane:v9:3x3:e30"),
            Err(TransferError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            TransferSnapshot::decode("lane:v1:0x3:e30"),
            Err(TransferError::InvalidDimensions(_))
        ));
        assert!(matches!(
            TransferSnapshot::decode("lane:v1:3x3"),
            Err(TransferError::MissingPayload)
        ));
        assert!(matches!(
            TransferSnapshot::decode("lane:v1:3x3:!!"),
            Err(TransferError::InvalidEncoding(_))
        ));
        assert!(matches!(
            TransferSnapshot::decode("lane:v1:3x3:e30"),
            Err(TransferError::InvalidPayload(_))
        ));
    }

    #[test]
    fn patch_carries_every_sub_object_under_one_version() {
        let writer = ParticipantId::new("host");
        let patch = populated().into_patch(&writer);

        let towers = patch.towers.expect("towers");
        assert_eq!(towers.version, Version::new(1, writer.clone()));
        assert_eq!(towers.value.len(), 1);
        assert_eq!(patch.ledger.expect("ledger").value.resources, 35);
        assert_eq!(patch.progress.expect("progress").value.wave, 2);
        assert!(patch.enemies.expect("enemies").value.is_empty());
    }
}
