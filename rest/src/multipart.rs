//! Assembly of `multipart/form-data` bodies for file uploads.
use rand::distributions::Alphanumeric;
use rand::Rng;

use glint_model::message::filename_is_valid;
use glint_model::{Error, ErrorKind, Result};

/// A `multipart/form-data` body under construction: one `payload_json` part
/// plus any number of file parts.
#[derive(Debug)]
pub struct Multipart {
    boundary: String,
    buf: Vec<u8>,
}

impl Multipart {
    /// Starts a body with a randomly generated boundary.
    pub fn new() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        Self::with_boundary(format!("glint-{}", suffix))
    }

    /// Starts a body with a caller-provided boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            buf: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    fn open_part(&mut self, disposition: &str, content_type: &str) {
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(self.boundary.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
        self.buf
            .extend_from_slice(format!("Content-Disposition: form-data; {}\r\n", disposition).as_bytes());
        self.buf
            .extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    }

    /// Appends the `payload_json` part carrying the request body.
    pub fn payload_json(&mut self, json: &[u8]) -> &mut Self {
        self.open_part("name=\"payload_json\"", "application/json");
        self.buf.extend_from_slice(json);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Appends a file under the default `files[N]` part name.
    pub fn file(
        &mut self,
        index: usize,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<&mut Self> {
        self.named_file(&format!("files[{}]", index), filename, content_type, data)
    }

    /// Appends a file under a caller-chosen part name.
    pub fn named_file(
        &mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<&mut Self> {
        if !filename_is_valid(filename) {
            return Err(Error::new(
                ErrorKind::InvalidParam,
                format!("invalid upload filename {:?}", filename),
            ));
        }
        self.open_part(
            &format!("name=\"{}\"; filename=\"{}\"", name, filename),
            content_type,
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        Ok(self)
    }

    /// Writes the terminating boundary and yields the body together with its
    /// Content-Type.
    pub fn finish(mut self) -> (Vec<u8>, String) {
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(self.boundary.as_bytes());
        self.buf.extend_from_slice(b"--\r\n");
        let content_type = format!("multipart/form-data; boundary={}", self.boundary);
        (self.buf, content_type)
    }
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_matches_rfc2046() {
        let mut form = Multipart::with_boundary("xyz");
        form.payload_json(br#"{"content":"x"}"#);
        form.file(0, "file.png", "image/png", b"DATA").unwrap();
        let (body, content_type) = form.finish();
        let body = String::from_utf8(body).unwrap();

        assert_eq!(content_type, "multipart/form-data; boundary=xyz");
        assert_eq!(body.matches("--xyz\r\n").count(), 2);
        assert!(body.contains(
            "Content-Disposition: form-data; name=\"payload_json\"\r\nContent-Type: application/json\r\n\r\n{\"content\":\"x\"}\r\n"
        ));
        assert!(body.contains(
            "Content-Disposition: form-data; name=\"files[0]\"; filename=\"file.png\"\r\nContent-Type: image/png\r\n\r\nDATA\r\n"
        ));
        assert!(body.ends_with("--xyz--\r\n"));
    }

    #[test]
    fn generated_boundaries_are_unique_enough() {
        let a = Multipart::new();
        let b = Multipart::new();
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn rejects_unsafe_filenames() {
        let mut form = Multipart::with_boundary("xyz");
        assert!(form.file(0, "../escape.png", "image/png", b"x").is_err());
        assert!(form.file(0, "sp ace.png", "image/png", b"x").is_err());
    }
}
