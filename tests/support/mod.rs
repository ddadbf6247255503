#![allow(dead_code)]

use std::{fs, io, path::Path};

use axum::http::{HeaderName, HeaderValue, Request, StatusCode, request::Parts};
use trellis::templates::{ErrorKind, ResponseSink, TemplateError};

/// Write `files` below `root`, creating parent directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, contents) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create template directory");
        }
        fs::write(&path, contents).expect("write template file");
    }
}

pub fn request(path: &str) -> Parts {
    Request::builder()
        .uri(path)
        .body(())
        .expect("valid request")
        .into_parts()
        .0
}

/// Records every sink call; optionally fails body writes.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub status: Option<StatusCode>,
    pub writes: Vec<Vec<u8>>,
    pub failures: Vec<ErrorKind>,
    pub fail_writes: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn body(&self) -> String {
        String::from_utf8(self.writes.concat()).expect("utf-8 body")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.as_str() == name)
            .and_then(|(_, value)| value.to_str().ok())
    }
}

impl ResponseSink for RecordingSink {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.push((name, value));
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn write_body(&mut self, body: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
        }
        self.writes.push(body.to_vec());
        Ok(())
    }

    fn record_failure(&mut self, error: &TemplateError) {
        self.failures.push(error.kind());
    }
}
