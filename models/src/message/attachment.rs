use serde::{Deserialize, Serialize};

use crate::snowflake::Snowflake;

/// A file attached to a message.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Attachment {
    /// The snowflake ID of this attachment.
    pub id: Snowflake,
    /// The name of the file attached.
    pub filename: String,
    /// The title of the file, if different from the filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The description of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The media type of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// The size of the file in bytes.
    #[serde(default)]
    pub size: u64,
    /// The source URL of the file.
    #[serde(default)]
    pub url: String,
    /// A proxied URL of the file.
    #[serde(default)]
    pub proxy_url: String,
    /// The height of the file, if it is an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// The width of the file, if it is an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Whether this attachment is ephemeral.
    #[serde(default)]
    pub ephemeral: bool,
    /// The duration of a voice message, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// The sampled waveform of a voice message, base64 encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform: Option<String>,
    /// Attachment flags.
    #[serde(default)]
    pub flags: u64,
}

/// An attachment slot in an outgoing request: an index into the upload part
/// list when files are being uploaded, an existing attachment snowflake when
/// retaining files on edit.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct AttachmentDescriptor {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Whether a filename is safe to send as an upload part.
///
/// Accepts ASCII letters, digits, `_`, `.` and `-`; rejects the empty name,
/// the `.` and `..` traversal names, control characters and anything
/// non-ASCII.
pub fn filename_is_valid(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    name.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::filename_is_valid;

    #[test]
    fn accepts_plain_names() {
        for name in ["file.png", "a", "archive.tar.gz", "under_score-dash.txt"] {
            assert!(filename_is_valid(name), "{name:?} should be valid");
        }
    }

    #[test]
    fn rejects_traversal_control_and_non_ascii() {
        for name in ["", ".", "..", "sp ace.png", "tab\t.png", "new\nline", "naïve.png", "a/b.png", "nul\0"] {
            assert!(!filename_is_valid(name), "{name:?} should be invalid");
        }
    }
}
