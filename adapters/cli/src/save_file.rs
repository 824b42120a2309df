//! Player state stored as a small TOML document.

use std::{fs, io::ErrorKind, path::PathBuf};

use pounce_core::{Persistence, PersistenceError, SavedSession};
use tracing::debug;

/// Persists the best score, player name and credits in a TOML file.
#[derive(Debug)]
pub(crate) struct TomlSaveFile {
    path: PathBuf,
}

impl TomlSaveFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Persistence for TomlSaveFile {
    fn load_session(&mut self) -> Result<SavedSession, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no save file yet");
                return Ok(SavedSession::default());
            }
            Err(error) => {
                return Err(PersistenceError::Unavailable(format!(
                    "{}: {error}",
                    self.path.display()
                )))
            }
        };
        toml::from_str(&contents).map_err(|error| {
            PersistenceError::Malformed(format!("{}: {error}", self.path.display()))
        })
    }

    fn save_session(&mut self, session: &SavedSession) -> Result<(), PersistenceError> {
        let contents = toml::to_string(session)
            .map_err(|error| PersistenceError::Malformed(error.to_string()))?;
        fs::write(&self.path, contents).map_err(|error| {
            PersistenceError::Unavailable(format!("{}: {error}", self.path.display()))
        })
    }
}
