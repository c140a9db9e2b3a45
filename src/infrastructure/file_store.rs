use crate::domain::credentials::Credentials;
use crate::domain::ports::CredentialStore;
use crate::error::{PosError, Result};
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

/// A credential store persisted as a small JSON file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a crash never leaves a half-written file. The file is
/// removed on logout. Reads are served from the in-memory copy loaded at
/// `open` and kept in sync by every write.
///
/// This struct is thread-safe (`Clone` shares the underlying state).
#[derive(Clone)]
pub struct FileCredentialStore {
    path: Arc<PathBuf>,
    state: Arc<watch::Sender<Option<Credentials>>>,
    write_lock: Arc<Mutex<()>>,
}

impl FileCredentialStore {
    /// Opens the store at `path`, loading existing credentials if present.
    ///
    /// A missing file means "logged out". An unreadable or malformed file is
    /// treated the same way and logged.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let current = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Credentials>(&bytes) {
                Ok(stored) => stored.validated(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring malformed credentials file");
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), logged_in = current.is_some(), "credential store opened");

        let (state, _) = watch::channel(current);
        Ok(Self {
            path: Arc::new(path),
            state: Arc::new(state),
            write_lock: Arc::new(Mutex::new(())),
        })
    }
}

fn write_atomically(path: &Path, credentials: &Credentials) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut file, credentials)?;
    file.flush()?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| PosError::Io(e.error))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<Option<Credentials>> {
        Ok(self.state.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Credentials>> {
        self.state.subscribe()
    }

    async fn set(&self, token: &str, display_name: &str) -> Result<()> {
        let credentials = Credentials::new(token, display_name);
        let _lock = self.write_lock.lock().await;

        let path = self.path.clone();
        let to_write = credentials.clone();
        tokio::task::spawn_blocking(move || match to_write {
            Some(c) => write_atomically(&path, &c),
            None => remove_if_present(&path),
        })
        .await
        .map_err(|e| PosError::Io(std::io::Error::other(e)))??;

        self.state.send_replace(credentials);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let _lock = self.write_lock.lock().await;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || remove_if_present(&path))
            .await
            .map_err(|e| PosError::Io(std::io::Error::other(e)))??;

        self.state.send_replace(None);
        Ok(())
    }
}
