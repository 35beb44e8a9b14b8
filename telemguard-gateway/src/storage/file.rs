//! Append-only JSON-lines store
//!
//! One measurement per line, written and flushed before `append` returns.
//! Opening a store replays the file: unreadable lines are skipped and
//! counted, and identifiers resume after the highest one found. An
//! unterminated last line (interrupted write) is cut off so the next append
//! starts on a fresh line. A failed append truncates the file back to its
//! previous length.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use telemguard_core::{time::Timestamp, MeasurementId, PersistedMeasurement, SensorReading};

use super::{MeasurementStore, StorageError, Table};

#[derive(Debug)]
struct Inner {
    table: Table,
    file: File,
    /// Bytes of complete lines on disk
    len: u64,
}

/// Durable store backed by a single file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<Inner>,
    corrupt_lines: usize,
}

impl FileStore {
    /// Open or create the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let mut corrupt_lines = 0;
        let complete = contents.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        if complete < contents.len() {
            corrupt_lines += 1;
            log::warn!(
                "Discarding {} bytes of unterminated data at the end of {}",
                contents.len() - complete,
                path.display()
            );
            file.set_len(complete as u64)?;
        }

        let mut replayed = Vec::new();
        for (index, line) in contents[..complete].split(|b| *b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<PersistedMeasurement>(line) {
                Ok(measurement) => replayed.push(measurement),
                Err(e) => {
                    corrupt_lines += 1;
                    log::warn!("Skipping corrupt line {} in {}: {}", index + 1, path.display(), e);
                }
            }
        }

        replayed.sort_by_key(|m| m.id);
        replayed.dedup_by_key(|m| m.id);

        let mut table = Table::default();
        for measurement in replayed {
            table.commit(measurement);
        }

        log::info!(
            "Opened measurement store {} ({} rows, {} corrupt lines skipped)",
            path.display(),
            table.len(),
            corrupt_lines
        );

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                table,
                file,
                len: complete as u64,
            }),
            corrupt_lines,
        })
    }

    /// Location on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines skipped while opening
    pub fn corrupt_lines(&self) -> usize {
        self.corrupt_lines
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MeasurementStore for FileStore {
    fn append(&self, reading: &SensorReading) -> Result<PersistedMeasurement, StorageError> {
        let mut inner = self.inner();
        let measurement = inner.table.stage(reading);

        let mut line = serde_json::to_vec(&measurement)?;
        line.push(b'\n');
        let written = inner.file.write_all(&line).and_then(|()| inner.file.flush());
        if let Err(e) = written {
            let len = inner.len;
            if let Err(trunc) = inner.file.set_len(len) {
                log::error!("Cannot roll back partial write to {}: {}", self.path.display(), trunc);
            }
            return Err(e.into());
        }

        inner.len += line.len() as u64;
        inner.table.commit(measurement);
        Ok(measurement)
    }

    fn scan_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<PersistedMeasurement>, StorageError> {
        Ok(self.inner().table.scan(start, end, None))
    }

    fn scan_sensor(
        &self,
        sensor_id: i32,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<PersistedMeasurement>, StorageError> {
        Ok(self.inner().table.scan(start, end, Some(sensor_id)))
    }

    fn get(&self, id: MeasurementId) -> Result<Option<PersistedMeasurement>, StorageError> {
        Ok(self.inner().table.get(id))
    }

    fn latest(&self, n: usize) -> Result<Vec<PersistedMeasurement>, StorageError> {
        Ok(self.inner().table.latest(n))
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.inner().table.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reading(timestamp: Timestamp) -> SensorReading {
        SensorReading::new(1, 25.5, 1013.25, 65.2, timestamp)
    }

    #[test]
    fn reopen_resumes_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensor.jsonl");

        {
            let store = FileStore::open(&path).unwrap();
            assert_eq!(store.append(&reading(1)).unwrap().id, 1);
            assert_eq!(store.append(&reading(2)).unwrap().id, 2);
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get(2).unwrap().map(|m| m.timestamp()), Some(2));
        assert_eq!(store.append(&reading(3)).unwrap().id, 3);
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensor.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"id":4,"sensor_id":1,"temperature":20.0,"pressure":1000.0,"humidity":40.0,"timestamp":9}"#,
                "\n",
                "{truncated\n",
                "\n",
            ),
        )
        .unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.corrupt_lines(), 1);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.append(&reading(10)).unwrap().id, 5);
    }

    #[test]
    fn interrupted_write_does_not_swallow_next_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensor.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"id":1,"sensor_id":1,"temperature":20.0,"pressure":1000.0,"humidity":40.0,"timestamp":9}"#,
                "\n",
                r#"{"id":2,"sensor_"#,
            ),
        )
        .unwrap();

        {
            let store = FileStore::open(&path).unwrap();
            assert_eq!(store.corrupt_lines(), 1);
            assert_eq!(store.append(&reading(10)).unwrap().id, 2);
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.corrupt_lines(), 0);
        assert_eq!(store.get(2).unwrap().map(|m| m.timestamp()), Some(10));
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn every_append_reaches_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensor.jsonl");
        let store = FileStore::open(&path).unwrap();

        store.append(&reading(1)).unwrap();
        store.append(&reading(2)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| l.contains("\"sensor_id\":1")));
    }

    #[test]
    fn unopenable_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(FileStore::open(dir.path()), Err(StorageError::Io(_))));
    }
}
