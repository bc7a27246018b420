use std::io;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// A single ballot cast by a voter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Vote {
    /// Opaque identifier of the voter
    pub voter_id: String,

    /// Display name of the voter
    pub voter_name: String,

    /// The option the voter chose
    #[serde(rename = "candidate_voted")]
    pub candidate: String,
}

impl Vote {
    pub fn new(
        voter_id: impl Into<String>,
        voter_name: impl Into<String>,
        candidate: impl Into<String>,
    ) -> Self {
        Vote {
            voter_id: voter_id.into(),
            voter_name: voter_name.into(),
            candidate: candidate.into(),
        }
    }
}

/// Represents a sealed block of votes in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// 1-based position of the block in the chain
    pub index: u64,

    /// Timestamp when the block was created
    #[serde(with = "iso8601")]
    #[schema(value_type = String, example = "2025-01-01T12:00:00.026490+00:00")]
    pub timestamp: DateTime<Utc>,

    /// Votes captured from the pending pool, in submission order
    pub votes: Vec<Vote>,

    /// Proof of work relative to the previous block's proof
    pub proof: u64,

    /// Content hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `votes` - The votes to include in the block
    /// * `proof` - The proof of work
    /// * `previous_hash` - The content hash of the previous block
    ///
    /// # Returns
    ///
    /// A new Block instance
    pub fn new(index: u64, votes: Vec<Vote>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            // Microseconds are the finest unit the canonical encoding carries.
            timestamp: Utc::now().trunc_subsecs(6),
            votes,
            proof,
            previous_hash,
        }
    }

    /// Renders the block in its canonical form
    ///
    /// Keys are sorted at every level and the byte layout matches a
    /// conventional sorted-key JSON dump (`", "` and `": "` separators,
    /// every character outside printable ASCII escaped as `\uXXXX`).
    /// Any change here changes every downstream hash.
    pub fn canonical_json(&self) -> serde_json::Result<String> {
        let value = sort_keys(serde_json::to_value(self)?);

        let mut buf = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buf, CanonicalFormatter);
        value.serialize(&mut serializer)?;

        // The formatter only ever emits ASCII.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Calculates the content hash of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 digest of the canonical encoding as a lowercase hexadecimal string
    pub fn content_hash(&self) -> serde_json::Result<String> {
        let encoded = self.canonical_json()?;
        Ok(hex::encode(Sha256::digest(encoded.as_bytes())))
    }
}

/// Rebuilds every object with its keys in lexicographic order.
///
/// Independent of whether `serde_json` was built with `preserve_order`.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    // Quotes, backslashes and control characters never reach this method;
    // serde_json routes them through `write_char_escape`.
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;

        for (offset, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }

            writer.write_all(fragment[start..offset].as_bytes())?;

            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }

            start = offset + ch.len_utf8();
        }

        writer.write_all(fragment[start..].as_bytes())
    }
}

/// ISO-8601 rendering of block timestamps: `YYYY-MM-DDTHH:MM:SS[.ffffff]+00:00`,
/// with the fraction omitted when the microsecond field is zero.
pub mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn format(timestamp: &DateTime<Utc>) -> String {
        if timestamp.timestamp_subsec_micros() == 0 {
            timestamp.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
        } else {
            timestamp.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
        }
    }

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(timestamp))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn genesis_fixture() -> Block {
        Block {
            index: 1,
            timestamp: at("2025-01-01T00:00:00Z"),
            votes: Vec::new(),
            proof: 100,
            previous_hash: "1".to_string(),
        }
    }

    fn second_block_fixture() -> Block {
        Block {
            index: 2,
            timestamp: at("2025-01-01T00:00:01.5Z"),
            votes: vec![
                Vote::new("v1", "Alice", "Candidate A"),
                Vote::new("v2", "Zoë \"Z\"", "Candidate B"),
            ],
            proof: 35293,
            previous_hash: "9c306264578e9bc76f625afd6f3295cd7d9a77add40a194e0ac41226e5c52339"
                .to_string(),
        }
    }

    #[test]
    fn test_new_block() {
        let votes = vec![Vote::new("v1", "Alice", "Candidate A")];

        let block = Block::new(2, votes.clone(), 35293, "previous_hash".to_string());

        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 35293);
        assert_eq!(block.previous_hash, "previous_hash");
        assert_eq!(block.votes, votes);
        assert_eq!(block.timestamp.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_canonical_json_layout() {
        assert_eq!(
            genesis_fixture().canonical_json().unwrap(),
            r#"{"index": 1, "previous_hash": "1", "proof": 100, "timestamp": "2025-01-01T00:00:00+00:00", "votes": []}"#
        );

        let encoded = second_block_fixture().canonical_json().unwrap();
        assert!(encoded.contains(
            r#"{"candidate_voted": "Candidate B", "voter_id": "v2", "voter_name": "Zo\u00eb \"Z\""}"#
        ));
        assert!(encoded.contains(r#""timestamp": "2025-01-01T00:00:01.500000+00:00""#));
    }

    #[test]
    fn test_content_hash_matches_reference_digests() {
        let genesis = genesis_fixture();
        assert_eq!(
            genesis.content_hash().unwrap(),
            "9c306264578e9bc76f625afd6f3295cd7d9a77add40a194e0ac41226e5c52339"
        );

        let second = second_block_fixture();
        assert_eq!(second.previous_hash, genesis.content_hash().unwrap());
        assert_eq!(
            second.content_hash().unwrap(),
            "d7ef6d5f3783faf49f43e3b94975b4857d525b7b6dcfe22776289485e949d12f"
        );
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let block = second_block_fixture();
        let hash = block.content_hash().unwrap();

        assert_eq!(hash.len(), 64);
        assert_eq!(hash, block.content_hash().unwrap());
        assert_eq!(hash, block.clone().content_hash().unwrap());
    }

    #[test]
    fn test_content_hash_changes_with_any_field() {
        let base = second_block_fixture();
        let base_hash = base.content_hash().unwrap();

        let mut reordered = base.clone();
        reordered.votes.reverse();

        let mut reproved = base.clone();
        reproved.proof += 1;

        let mut relinked = base.clone();
        relinked.previous_hash = "0".repeat(64);

        let mut retimed = base.clone();
        retimed.timestamp = at("2025-01-01T00:00:01.500001Z");

        let mut recast = base.clone();
        recast.votes[0].candidate = "Candidate C".to_string();

        for changed in [reordered, reproved, relinked, retimed, recast] {
            assert_ne!(changed.content_hash().unwrap(), base_hash);
        }
    }

    #[test]
    fn test_escapes_non_ascii_like_the_reference_encoder() {
        let mut block = genesis_fixture();
        block.votes.push(Vote::new("\u{1F5F3}", "tab\there", "\u{7f}\u{1}/"));

        let encoded = block.canonical_json().unwrap();
        assert!(encoded.contains(r#""voter_id": "\ud83d\uddf3""#));
        assert!(encoded.contains(r#""voter_name": "tab\there""#));
        assert!(encoded.contains(r#""candidate_voted": "\u007f\u0001/""#));
        assert!(encoded.is_ascii());
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(
            iso8601::format(&at("2025-01-01T00:00:00.026490Z")),
            "2025-01-01T00:00:00.026490+00:00"
        );
        assert_eq!(
            iso8601::format(&at("2025-06-30T23:59:59Z")),
            "2025-06-30T23:59:59+00:00"
        );
    }

    #[test]
    fn test_display_json_round_trip_preserves_hash() {
        let block = second_block_fixture();

        let json = serde_json::to_string(&block).unwrap();
        let restored: Block = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, block);
        assert_eq!(restored.content_hash().unwrap(), block.content_hash().unwrap());
    }
}
