use bstr::{BStr, BString, ByteSlice};
use git_hash::hasher::Hasher;
use git_hash::{HashAlgorithm, HashError, ObjectId};

use crate::{ObjectError, ObjectType};

/// Timestamp with timezone as stored in commit signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigDate {
    /// Seconds since Unix epoch.
    pub timestamp: i64,
    /// Timezone offset in minutes from UTC (e.g., -300 for EST).
    pub tz_offset: i32,
}

impl SigDate {
    pub fn new(timestamp: i64, tz_offset_minutes: i32) -> Self {
        Self {
            timestamp,
            tz_offset: tz_offset_minutes,
        }
    }

    /// Parse the raw `timestamp tz` form, e.g. `"1234567890 +0530"`.
    pub fn parse(input: &str) -> Result<Self, ObjectError> {
        let mut parts = input.split_whitespace();
        let ts = parts
            .next()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| ObjectError::InvalidSignature(format!("bad timestamp in '{input}'")))?;
        let tz = match parts.next() {
            None => 0,
            Some(s) => parse_tz(s)
                .ok_or_else(|| ObjectError::InvalidSignature(format!("bad timezone in '{input}'")))?,
        };
        Ok(Self::new(ts, tz))
    }

    /// Format in the raw `timestamp tz` form.
    pub fn to_raw(&self) -> String {
        format!("{} {:+05}", self.timestamp, minutes_to_decimal(self.tz_offset))
    }
}

/// Parse a `+hhmm`/`-hhmm` timezone into minutes from UTC.
fn parse_tz(s: &str) -> Option<i32> {
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => (1, s),
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let raw: i32 = digits.parse().ok()?;
    let hours = raw / 100;
    let mins = raw % 100;
    Some(sign * (hours * 60 + mins))
}

/// Convert minutes from UTC to the decimal `hhmm` representation.
fn minutes_to_decimal(minutes: i32) -> i32 {
    let sign = if minutes < 0 { -1 } else { 1 };
    let abs = minutes.unsigned_abs() as i32;
    sign * ((abs / 60) * 100 + abs % 60)
}

/// Author/committer identity with timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: BString,
    pub email: BString,
    pub date: SigDate,
}

impl Signature {
    /// Parse from the header format: `Name <email> timestamp tz`.
    pub fn parse(input: &BStr) -> Result<Self, ObjectError> {
        let input = input.as_bytes();

        let gt_pos = input
            .iter()
            .rposition(|&b| b == b'>')
            .ok_or_else(|| ObjectError::InvalidSignature("missing '>'".into()))?;
        let lt_pos = input[..gt_pos]
            .iter()
            .rposition(|&b| b == b'<')
            .ok_or_else(|| ObjectError::InvalidSignature("missing '<'".into()))?;

        let name = input[..lt_pos].trim();
        let email = &input[lt_pos + 1..gt_pos];

        let date_str = input[gt_pos + 1..].trim();
        let date_str = std::str::from_utf8(date_str)
            .map_err(|_| ObjectError::InvalidSignature("non-UTF-8 date".into()))?;
        let date = SigDate::parse(date_str)?;

        Ok(Self {
            name: BString::from(name),
            email: BString::from(email),
            date,
        })
    }

    /// Format in the canonical header form: `Name <email> timestamp tz`.
    pub fn to_bytes(&self) -> BString {
        let mut out = BString::from(Vec::new());
        out.extend_from_slice(&self.name);
        out.extend_from_slice(b" <");
        out.extend_from_slice(&self.email);
        out.extend_from_slice(b"> ");
        out.extend_from_slice(self.date.to_raw().as_bytes());
        out
    }
}

/// A commit object.
///
/// Only the headers the traversal layer consumes are modeled: tree, parents,
/// author, committer, and the message. Other headers (encoding, gpgsig,
/// mergetag, …) are skipped during parsing and are not preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// OID of the root tree.
    pub tree: ObjectId,
    /// Parent commit OIDs in order (empty for a root commit).
    pub parents: Vec<ObjectId>,
    /// Author identity and timestamp.
    pub author: Signature,
    /// Committer identity and timestamp.
    pub committer: Signature,
    /// Commit message (everything after the blank line separator).
    pub message: BString,
}

impl Commit {
    /// Parse commit content from raw bytes (no object-store header).
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut tree: Option<ObjectId> = None;
        let mut parents = Vec::new();
        let mut author: Option<Signature> = None;
        let mut committer: Option<Signature> = None;

        let data = content;
        let mut pos = 0;

        loop {
            if pos >= data.len() {
                break;
            }
            // A blank line separates headers from the message.
            if data[pos] == b'\n' {
                pos += 1;
                break;
            }

            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| p + pos)
                .unwrap_or(data.len());
            let line = &data[pos..line_end];

            if let Some(space_pos) = line.iter().position(|&b| b == b' ') {
                let key = &line[..space_pos];
                let value = &line[space_pos + 1..];

                match key {
                    b"tree" => {
                        let hex = std::str::from_utf8(value)
                            .map_err(|_| ObjectError::InvalidHeader("non-UTF8 tree OID".into()))?;
                        tree = Some(ObjectId::from_hex(hex)?);
                    }
                    b"parent" => {
                        let hex = std::str::from_utf8(value)
                            .map_err(|_| ObjectError::InvalidHeader("non-UTF8 parent OID".into()))?;
                        parents.push(ObjectId::from_hex(hex)?);
                    }
                    b"author" => {
                        author = Some(Signature::parse(value.as_bstr())?);
                    }
                    b"committer" => {
                        committer = Some(Signature::parse(value.as_bstr())?);
                    }
                    _ => {
                        // Unmodeled header; skip it and any continuation lines.
                        let mut next = line_end + 1;
                        while next < data.len() && data[next] == b' ' {
                            next = data[next..]
                                .iter()
                                .position(|&b| b == b'\n')
                                .map(|p| p + next + 1)
                                .unwrap_or(data.len());
                        }
                        pos = next;
                        continue;
                    }
                }
            }

            pos = line_end + 1;
        }

        let tree = tree.ok_or(ObjectError::MissingCommitField { field: "tree" })?;
        let author = author.ok_or(ObjectError::MissingCommitField { field: "author" })?;
        let committer =
            committer.ok_or(ObjectError::MissingCommitField { field: "committer" })?;

        let message = BString::from(&data[pos.min(data.len())..]);

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message,
        })
    }

    /// Serialize commit content to bytes (no object-store header).
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');

        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }

        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author.to_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"committer ");
        out.extend_from_slice(&self.committer.to_bytes());
        out.push(b'\n');

        out.push(b'\n');
        out.extend_from_slice(&self.message);

        out
    }

    /// Committer timestamp in seconds since epoch; this is the commit time
    /// the graph records.
    pub fn commit_time(&self) -> i64 {
        self.committer.date.timestamp
    }

    /// Compute the commit's OID: the hash of `"commit {len}\0"` followed by
    /// the serialized content, the framing the object store applies.
    pub fn compute_id(&self, algo: HashAlgorithm) -> Result<ObjectId, HashError> {
        let content = self.serialize_content();
        let mut hasher = Hasher::new(algo);
        hasher.update(format!("{} {}\0", ObjectType::Commit.name(), content.len()).as_bytes());
        hasher.update(&content);
        hasher.finalize()
    }
}
