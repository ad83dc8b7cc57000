use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use orion_common::Entity;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read line {line} of {path}: {source}")]
    Read {
        path: String,
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON on line {line} of {path}: {source}")]
    InvalidJson {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Opens `path` for line-oriented reading, transparently decompressing if
/// the extension ends in `.gz`.
fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, StreamError> {
    let file = File::open(path).map_err(|source| StreamError::Open {
        path: path.display().to_string(),
        source,
    })?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Opens `path` for line-oriented writing (truncating any existing file),
/// transparently compressing if the extension ends in `.gz`.
fn open_writer(path: &Path) -> Result<Box<dyn Write>, StreamError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path).map_err(|source| StreamError::Open {
        path: path.display().to_string(),
        source,
    })?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// An iterator over the JSON objects of a `.jsonl` (optionally `.jsonl.gz`)
/// file. Each line must decode to a JSON object; malformed lines surface an
/// error rather than being silently skipped.
pub struct JsonlReader {
    path: String,
    reader: Box<dyn BufRead>,
    line_no: usize,
}

impl JsonlReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        Ok(JsonlReader {
            path: path.display().to_string(),
            reader: open_reader(path)?,
            line_no: 0,
        })
    }
}

impl Iterator for JsonlReader {
    type Item = Result<Entity, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut line = String::new();
            let bytes_read = match self.reader.read_line(&mut line) {
                Ok(n) => n,
                Err(source) => {
                    return Some(Err(StreamError::Read {
                        path: self.path.clone(),
                        line: self.line_no + 1,
                        source,
                    }))
                }
            };
            if bytes_read == 0 {
                return None;
            }
            self.line_no += 1;
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str::<Entity>(trimmed).map_err(|source| {
                    StreamError::InvalidJson {
                        path: self.path.clone(),
                        line: self.line_no,
                        source,
                    }
                }),
            );
        }
    }
}

/// A line-oriented writer for JSONL files. Writes one compact JSON object
/// per line, always terminated with a single `\n`, matching the output
/// contract in `spec.md` §4.7.
pub struct JsonlWriter {
    writer: Box<dyn Write>,
}

impl JsonlWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        Ok(JsonlWriter {
            writer: open_writer(path.as_ref())?,
        })
    }

    pub fn write(&mut self, entity: &Entity) -> Result<(), StreamError> {
        serde_json::to_writer(&mut self.writer, entity)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads `path` fully into memory and returns each decoded object.
///
/// Prefer [`JsonlReader`] for anything that streams; this is a convenience
/// for small fixtures and tests.
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<Entity>, StreamError> {
    JsonlReader::open(path)?.collect()
}

/// Splits an iterator into chunks of at most `size` items, yielding a
/// (possibly smaller) final chunk. `size` must be nonzero.
pub struct Chunks<I: Iterator> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Chunks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut out = Vec::with_capacity(self.size);
        for item in self.inner.by_ref().take(self.size) {
            out.push(item);
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

pub fn chunk<I: Iterator>(iter: I, size: usize) -> Chunks<I> {
    assert!(size > 0, "chunk size must be nonzero");
    Chunks { inner: iter, size }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_plain_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.jsonl");

        let mut w = JsonlWriter::create(&path).unwrap();
        w.write(json!({"id": "X:1", "name": "a"}).as_object().unwrap())
            .unwrap();
        w.write(json!({"id": "X:2", "name": "b"}).as_object().unwrap())
            .unwrap();
        w.flush().unwrap();

        let got = read_jsonl(&path).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].get("id").unwrap(), "X:1");
    }

    #[test]
    fn round_trips_gzipped_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.jsonl.gz");

        let mut w = JsonlWriter::create(&path).unwrap();
        w.write(json!({"id": "X:1"}).as_object().unwrap()).unwrap();
        w.flush().unwrap();

        let got = read_jsonl(&path).unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn chunk_yields_partial_final_chunk() {
        let chunks: Vec<_> = chunk(0..5, 2).collect();
        assert_eq!(chunks, vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn chunk_exact_multiple_has_no_empty_trailing_chunk() {
        let chunks: Vec<_> = chunk(0..4, 2).collect();
        assert_eq!(chunks, vec![vec![0, 1], vec![2, 3]]);
    }
}
