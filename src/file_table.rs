//! File-handle table: one entry per open file-id, guaranteed to flush/close on any unwind path.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};

use crate::ast::FileMode;
use crate::error::EvalError;

struct FileHandle {
    mode: FileMode,
    at_eof: bool,
    reader: Option<BufReader<File>>,
    writer: Option<File>,
}

impl FileHandle {
    fn open(path: &str, mode: FileMode) -> Result<Self, EvalError> {
        let (reader, writer) = match mode {
            FileMode::Read => {
                let f = File::open(path).map_err(|e| EvalError::io_error(path, e.to_string()))?;
                (Some(BufReader::new(f)), None)
            }
            FileMode::Write => {
                let f = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)
                    .map_err(|e| EvalError::io_error(path, e.to_string()))?;
                (None, Some(f))
            }
            FileMode::Append => {
                let f = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| EvalError::io_error(path, e.to_string()))?;
                (None, Some(f))
            }
        };
        Ok(FileHandle {
            mode,
            at_eof: false,
            reader,
            writer,
        })
    }

    fn read_line(&mut self, path: &str) -> Result<String, EvalError> {
        if !matches!(self.mode, FileMode::Read) {
            return Err(EvalError::file_mode_mismatch(path, "reading"));
        }
        let reader = self.reader.as_mut().expect("read handle present for READ mode");
        let mut buf = String::new();
        let n = reader
            .read_line(&mut buf)
            .map_err(|e| EvalError::io_error(path, e.to_string()))?;
        if n == 0 {
            self.at_eof = true;
            return Ok(String::new());
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(buf)
    }

    fn write_line(&mut self, path: &str, content: &str) -> Result<(), EvalError> {
        if !matches!(self.mode, FileMode::Write | FileMode::Append) {
            return Err(EvalError::file_mode_mismatch(path, "writing"));
        }
        let writer = self.writer.as_mut().expect("write handle present for WRITE/APPEND mode");
        writeln!(writer, "{}", content).map_err(|e| EvalError::io_error(path, e.to_string()))?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;
        self.reader = None;
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Keyed by upper-cased file-id. At most one handle per id at any time.
#[derive(Default)]
pub struct FileTable {
    files: HashMap<String, FileHandle>,
}

impl FileTable {
    pub fn new() -> Self {
        FileTable {
            files: HashMap::new(),
        }
    }

    pub fn open(&mut self, file_id: &str, path: &str, mode: FileMode) -> Result<(), EvalError> {
        let key = file_id.to_uppercase();
        if self.files.contains_key(&key) {
            return Err(EvalError::FileAlreadyOpen(file_id.to_string()));
        }
        let handle = FileHandle::open(path, mode)?;
        self.files.insert(key, handle);
        Ok(())
    }

    pub fn read_line(&mut self, file_id: &str) -> Result<String, EvalError> {
        let key = file_id.to_uppercase();
        let handle = self
            .files
            .get_mut(&key)
            .ok_or_else(|| EvalError::FileNotOpen(file_id.to_string()))?;
        handle.read_line(file_id)
    }

    pub fn write_line(&mut self, file_id: &str, content: &str) -> Result<(), EvalError> {
        let key = file_id.to_uppercase();
        let handle = self
            .files
            .get_mut(&key)
            .ok_or_else(|| EvalError::FileNotOpen(file_id.to_string()))?;
        handle.write_line(file_id, content)
    }

    pub fn is_eof(&self, file_id: &str) -> Result<bool, EvalError> {
        let key = file_id.to_uppercase();
        self.files
            .get(&key)
            .map(|h| h.at_eof)
            .ok_or_else(|| EvalError::FileNotOpen(file_id.to_string()))
    }

    pub fn close(&mut self, file_id: &str) {
        let key = file_id.to_uppercase();
        if let Some(mut handle) = self.files.remove(&key) {
            handle.close();
        }
    }

    pub fn close_all(&mut self) {
        for (_, mut handle) in self.files.drain() {
            handle.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let path_str = path.to_str().unwrap().to_string();

        let mut table = FileTable::new();
        table.open("F", &path_str, FileMode::Write).unwrap();
        table.write_line("F", "line1").unwrap();
        table.close("F");

        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "line1\n");

        table.open("F", &path_str, FileMode::Read).unwrap();
        let line = table.read_line("F").unwrap();
        assert_eq!(line, "line1");
        assert!(!table.is_eof("F").unwrap());
        let next = table.read_line("F").unwrap();
        assert_eq!(next, "");
        assert!(table.is_eof("F").unwrap());
    }

    #[test]
    fn double_open_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let path_str = path.to_str().unwrap().to_string();

        let mut table = FileTable::new();
        table.open("F", &path_str, FileMode::Write).unwrap();
        assert!(table.open("F", &path_str, FileMode::Write).is_err());
    }

    #[test]
    fn double_close_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let path_str = path.to_str().unwrap().to_string();

        let mut table = FileTable::new();
        table.open("F", &path_str, FileMode::Write).unwrap();
        table.close("F");
        table.close("F");
    }

    #[test]
    fn reading_unopened_file_fails() {
        let mut table = FileTable::new();
        assert!(table.read_line("NOPE").is_err());
    }
}
