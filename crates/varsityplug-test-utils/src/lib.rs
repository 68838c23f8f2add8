//! Fixtures shared by the Varsity Plug test suites.
//!
//! Kept free of workspace crates so any crate can take it as a
//! dev-dependency without creating a cycle.

pub use pretty_assertions::{assert_eq, assert_ne};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;

const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// The reference mark sheet; its APS is 27.
pub const SAMPLE_MARKS: [(&str, i32); 7] = [
    ("English Home Language", 85),
    ("Afrikaans First Additional Language", 75),
    ("Mathematics", 65),
    ("Life Orientation", 90),
    ("History", 55),
    ("Geography", 45),
    ("Accounting", 35),
];

pub const SAMPLE_APS: u32 = 27;

/// A password that passes the registration policy.
pub const STRONG_PASSWORD: &str = "Matric!2025";

/// Smallest well-formed PDF readers accept; good enough for upload tests.
pub const TINY_PDF: &[u8] = b"%PDF-1.4\n1 0 obj<<>>endobj\ntrailer<<>>\n%%EOF\n";

pub fn unique_username(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("{prefix}{suffix}")
}

/// Marks-form fields (`subject_{i}`, `mark_{i}`) for the sample sheet.
pub fn sample_marks_form() -> Vec<(String, String)> {
    SAMPLE_MARKS
        .iter()
        .enumerate()
        .flat_map(|(i, (subject, mark))| {
            [
                (format!("subject_{i}"), subject.to_string()),
                (format!("mark_{i}"), mark.to_string()),
            ]
        })
        .collect()
}

/// Media directory removed when the guard drops.
pub fn temp_media_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("varsityplug-media-")
        .tempdir()
        .expect("create temp media dir")
}

/// `application/x-www-form-urlencoded` body.
pub fn form_body<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k.as_ref()), encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, FORM_VALUE).to_string()
}

/// Builds `multipart/form-data` request bodies.
pub struct Multipart {
    boundary: String,
    body: Vec<u8>,
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

impl Multipart {
    pub fn new() -> Self {
        Self { boundary: "varsityplug-test-boundary".to_string(), body: Vec::new() }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// (content type header value, body)
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (format!("multipart/form-data; boundary={}", self.boundary), self.body)
    }
}
