use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::types::ChatMessage;

/// Append-only transcript file, one flushed line per message:
/// `[HH:MM] <name> content`.
#[derive(Debug)]
pub struct TranscriptLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TranscriptLog {
    /// Open `path`, or a timestamp-named file (`%Y%m%d_%H%M%S.log`) in the
    /// working directory when no path is given. Existing files are truncated.
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
        let file = File::create(&path)?;
        Ok(Self { path, writer: BufWriter::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_message(&mut self, message: &ChatMessage) -> io::Result<()> {
        writeln!(
            self.writer,
            "{} <{}> {}",
            message.stamp(),
            message.display_name,
            message.content
        )?;
        self.writer.flush()
    }
}

/// Timestamp-derived default file name.
pub fn default_path() -> PathBuf {
    PathBuf::from(Local::now().format("%Y%m%d_%H%M%S.log").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.log");
        let mut log = TranscriptLog::open(Some(&path)).unwrap();
        log.write_message(&ChatMessage::user("alice", "hello bots")).unwrap();
        log.write_message(&ChatMessage::assistant("Zed", "sup")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("<alice> hello bots"));
        assert!(lines[1].ends_with("<Zed> sup"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn default_name_is_timestamped() {
        let name = default_path();
        let s = name.to_string_lossy();
        assert!(s.ends_with(".log"));
        assert_eq!(s.len(), "20240101_120000.log".len());
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("room.log");
        assert!(TranscriptLog::open(Some(&path)).is_err());
    }
}
