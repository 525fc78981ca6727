// Persisted key/value state: the id counter and the serialized post collection.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use libc::{EACCES, EPERM};
use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::post::Post;

const COUNTER_FILE: &str = "next_id";
const COLLECTION_FILE: &str = "posts.json";
const LOCK_FILE: &str = ".lock";

pub trait PersistentStore {
    fn counter(&self) -> Result<Option<u64>, Error>;
    fn set_counter(&mut self, next: u64) -> Result<(), Error>;
    fn collection(&self) -> Result<Option<Vec<Post>>, Error>;
    fn set_collection(&mut self, posts: &[Post]) -> Result<(), Error>;
    fn clear(&mut self) -> Result<(), Error>;
}

impl<T: PersistentStore + ?Sized> PersistentStore for Box<T> {
    fn counter(&self) -> Result<Option<u64>, Error> {
        (**self).counter()
    }

    fn set_counter(&mut self, next: u64) -> Result<(), Error> {
        (**self).set_counter(next)
    }

    fn collection(&self) -> Result<Option<Vec<Post>>, Error> {
        (**self).collection()
    }

    fn set_collection(&mut self, posts: &[Post]) -> Result<(), Error> {
        (**self).set_collection(posts)
    }

    fn clear(&mut self) -> Result<(), Error> {
        (**self).clear()
    }
}

/// In-process store; nothing survives the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    counter: Option<u64>,
    collection: Option<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(counter: Option<u64>, collection: Option<Vec<Post>>) -> Self {
        Self {
            counter,
            collection,
        }
    }
}

impl PersistentStore for MemoryStore {
    fn counter(&self) -> Result<Option<u64>, Error> {
        Ok(self.counter)
    }

    fn set_counter(&mut self, next: u64) -> Result<(), Error> {
        self.counter = Some(next);
        Ok(())
    }

    fn collection(&self) -> Result<Option<Vec<Post>>, Error> {
        Ok(self.collection.clone())
    }

    fn set_collection(&mut self, posts: &[Post]) -> Result<(), Error> {
        self.collection = Some(posts.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.counter = None;
        self.collection = None;
        Ok(())
    }
}

/// Directory-backed store. Writes go through a temp file + rename while an
/// exclusive lock on `<dir>/.lock` is held.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn counter_path(&self) -> PathBuf {
        self.dir.join(COUNTER_FILE)
    }

    pub fn collection_path(&self) -> PathBuf {
        self.dir.join(COLLECTION_FILE)
    }

    fn write_lock(&self) -> Result<WriteLock, Error> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            Error::new(io_error_kind(&err))
                .with_message("failed to create state directory")
                .with_path(&self.dir)
                .with_source(err)
        })?;
        let path = self.dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| {
                Error::new(io_error_kind(&err))
                    .with_path(&path)
                    .with_source(err)
            })?;
        file.lock_exclusive().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_path(&path)
                .with_source(err)
        })?;
        Ok(WriteLock { file })
    }

    fn replace_file(&self, name: &str, contents: &[u8]) -> Result<(), Error> {
        let _lock = self.write_lock()?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        let mut file = File::create(&tmp)
            .map_err(|err| Error::new(io_error_kind(&err)).with_path(&tmp).with_source(err))?;
        file.write_all(contents)
            .and_then(|()| file.sync_all())
            .map_err(|err| Error::new(ErrorKind::Io).with_path(&tmp).with_source(err))?;
        fs::rename(&tmp, &path)
            .map_err(|err| Error::new(io_error_kind(&err)).with_path(&path).with_source(err))?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote state file");
        Ok(())
    }
}

impl PersistentStore for FileStore {
    fn counter(&self) -> Result<Option<u64>, Error> {
        let path = self.counter_path();
        let Some(text) = read_optional(&path)? else {
            return Ok(None);
        };
        match text.trim().parse::<u64>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                warn!(path = %path.display(), "ignoring non-numeric id counter");
                Ok(None)
            }
        }
    }

    fn set_counter(&mut self, next: u64) -> Result<(), Error> {
        self.replace_file(COUNTER_FILE, next.to_string().as_bytes())
    }

    fn collection(&self) -> Result<Option<Vec<Post>>, Error> {
        let path = self.collection_path();
        let Some(text) = read_optional(&path)? else {
            return Ok(None);
        };
        serde_json::from_str(&text).map(Some).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("stored post collection is not valid json")
                .with_path(&path)
                .with_source(err)
        })
    }

    fn set_collection(&mut self, posts: &[Post]) -> Result<(), Error> {
        let encoded = serde_json::to_vec(posts).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode post collection")
                .with_source(err)
        })?;
        self.replace_file(COLLECTION_FILE, &encoded)
    }

    fn clear(&mut self) -> Result<(), Error> {
        if !self.dir.exists() {
            return Ok(());
        }
        let _lock = self.write_lock()?;
        for path in [self.counter_path(), self.collection_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed state file"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(Error::new(io_error_kind(&err))
                        .with_message("failed to clear state")
                        .with_path(&path)
                        .with_source(err));
                }
            }
        }
        Ok(())
    }
}

struct WriteLock {
    file: File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, Error> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::new(io_error_kind(&err))
            .with_message("failed to read state file")
            .with_path(path)
            .with_source(err)),
    }
}

fn io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || errno == EPERM {
        return ErrorKind::Permission;
    }
    match err.kind() {
        io::ErrorKind::WouldBlock => ErrorKind::Busy,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}
