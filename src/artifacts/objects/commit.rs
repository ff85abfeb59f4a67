//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s), first parent being the mainline
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! [other headers, continuation lines start with a space]
//!
//! <commit message>
//! ```
//!
//! The payload is kept as read. Fields are decoded for inspection (lossily
//! when a commit declares a non-UTF-8 `encoding`), while serialization
//! always returns the original bytes.

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};

/// Author, committer or tagger identity with its timestamp
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Author {
    name: String,
    email: String,
    timestamp: DateTime<FixedOffset>,
}

impl Author {
    pub fn new(name: String, email: String, timestamp: DateTime<FixedOffset>) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Serialized form "Name <email> timestamp timezone"
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }
}

impl TryFrom<&str> for Author {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::corrupt("signature", format!("{reason}: '{value}'"));

        // split from the right: timezone and timestamp come last
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(invalid("invalid author format"));
        }

        let timezone = parse_timezone(parts[0]).ok_or_else(|| invalid("invalid timezone"))?;
        let seconds = parts[1]
            .parse::<i64>()
            .map_err(|_| invalid("invalid timestamp"))?;
        let name_email_part = parts[2];

        let email_start = name_email_part
            .find('<')
            .ok_or_else(|| invalid("missing '<'"))?;
        let email_end = name_email_part
            .rfind('>')
            .filter(|&end| end > email_start)
            .ok_or_else(|| invalid("missing '>'"))?;

        let name = name_email_part[..email_start].trim().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();

        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| invalid("timestamp out of range"))?
            .with_timezone(&timezone);

        Ok(Author {
            name,
            email,
            timestamp,
        })
    }
}

/// Parse `+HHMM` / `-HHMM`
fn parse_timezone(raw: &str) -> Option<FixedOffset> {
    let (sign, digits) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parsed header block shared by commits and tags
pub(crate) fn split_headers(payload: &[u8]) -> (Vec<(String, String)>, String) {
    let text = String::from_utf8_lossy(payload);
    let (header_block, message) = match text.find("\n\n") {
        Some(split) => (&text[..split], text[split + 2..].to_string()),
        None => (text.trim_end_matches('\n'), String::new()),
    };

    let mut headers: Vec<(String, String)> = Vec::new();
    for line in header_block.lines() {
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = headers.last_mut() {
                value.push('\n');
                value.push_str(continuation);
            }
            continue;
        }

        match line.split_once(' ') {
            Some((key, value)) => headers.push((key.to_string(), value.to_string())),
            None => headers.push((line.to_string(), String::new())),
        }
    }

    (headers, message)
}

pub(crate) fn write_header(content: &mut String, key: &str, value: &str) {
    content.push_str(key);
    content.push(' ');
    content.push_str(&value.replace('\n', "\n "));
    content.push('\n');
}

/// Git commit object
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    tree_oid: ObjectId,
    /// Parent commit IDs in recorded order (empty for a root commit)
    parents: Vec<ObjectId>,
    author: Author,
    committer: Author,
    /// Headers other than tree/parent/author/committer (gpgsig, encoding, ...)
    extra_headers: Vec<(String, String)>,
    message: String,
    raw: Bytes,
}

impl Commit {
    pub fn new(
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        committer: Author,
        message: String,
    ) -> Self {
        let mut content = String::new();
        write_header(&mut content, "tree", &tree_oid.to_hex());
        for parent in &parents {
            write_header(&mut content, "parent", &parent.to_hex());
        }
        write_header(&mut content, "author", &author.display());
        write_header(&mut content, "committer", &committer.display());
        content.push('\n');
        content.push_str(&message);

        Commit {
            tree_oid,
            parents,
            author,
            committer,
            extra_headers: Vec::new(),
            message,
            raw: content.into(),
        }
    }

    /// Value of the first header named `key` outside the core fields
    pub fn header(&self, key: &str) -> Option<&str> {
        self.extra_headers
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// First line of the commit message
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    /// Message without its summary line
    pub fn body(&self) -> &str {
        self.message
            .split_once('\n')
            .map(|(_, body)| body.trim())
            .unwrap_or("")
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    /// First (mainline) parent
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    /// Commit date used to order history traversal
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.committer.timestamp()
    }
}

impl Packable for Commit {
    fn serialize_payload(&self) -> Bytes {
        self.raw.clone()
    }
}

impl Unpackable for Commit {
    fn deserialize(payload: Bytes) -> Result<Self> {
        let (headers, message) = split_headers(&payload);

        let mut tree_oid = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        let mut extra_headers = Vec::new();

        for (key, value) in headers {
            match key.as_str() {
                "tree" => tree_oid = Some(ObjectId::try_parse(&value).map_err(|_| {
                    Error::corrupt("commit", format!("invalid tree line '{value}'"))
                })?),
                "parent" => parents.push(ObjectId::try_parse(&value).map_err(|_| {
                    Error::corrupt("commit", format!("invalid parent line '{value}'"))
                })?),
                "author" => author = Some(Author::try_from(value.as_str())?),
                "committer" => committer = Some(Author::try_from(value.as_str())?),
                _ => extra_headers.push((key, value)),
            }
        }

        let tree_oid = tree_oid.ok_or_else(|| Error::corrupt("commit", "missing tree line"))?;
        let author = author.ok_or_else(|| Error::corrupt("commit", "missing author line"))?;
        let committer = committer.unwrap_or_else(|| author.clone());

        Ok(Commit {
            tree_oid,
            parents,
            author,
            committer,
            extra_headers,
            message,
            raw: payload,
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.serialize_payload()).into_owned()
    }
}
