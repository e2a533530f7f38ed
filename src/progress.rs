//! Ingest progress reporting.
//!
//! Progress goes to **stderr** so stdout stays the chat transcript or the
//! command's output. By default it is shown only when stderr is a TTY.

use memchat_core::retrieve::IngestProgress;
use std::io::Write;

/// A single progress event while building the GTM index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestEvent {
    /// Loading files from the articles directory. Total known.
    Loading { files: u64 },
    /// Documents embedded so far.
    Embedding { source_id: String, n: u64, total: u64 },
}

impl From<IngestProgress<'_>> for IngestEvent {
    fn from(p: IngestProgress<'_>) -> Self {
        IngestEvent::Embedding {
            source_id: p.source_id.to_string(),
            n: p.n as u64,
            total: p.total as u64,
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Human-friendly progress on stderr: "ingest gtm  embedding  12 / 1,204 documents".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let line = render(&event);
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

fn render(event: &IngestEvent) -> String {
    match event {
        IngestEvent::Loading { files } => {
            format!("ingest gtm  loading  {} files\n", format_number(*files))
        }
        IngestEvent::Embedding {
            source_id,
            n,
            total,
        } => format!(
            "ingest gtm  embedding  {} / {} documents  ({})\n",
            format_number(*n),
            format_number(*total),
            source_id
        ),
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn renders_embedding_line() {
        let event = IngestEvent::from(IngestProgress {
            source_id: "a.pdf",
            n: 3,
            total: 1200,
        });
        assert_eq!(
            render(&event),
            "ingest gtm  embedding  3 / 1,200 documents  (a.pdf)\n"
        );
    }
}
