//! Armazenamento chave/valor persistente que sobrevive a reinícios do processo.
//!
//! O [`KeyValueStore`] só conhece get/set/clear sobre valores JSON. O wrapper
//! [`Store`] acrescenta leitura/escrita tipada e os acessores da identidade
//! do candidato (token, prova, drive, workspace).

#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::StoreError;

/// Chaves persistidas. Cada componente escreve apenas as suas.
pub mod keys {
    pub const AUTH_TOKEN: &str = "authToken";
    pub const EXAM_STATE: &str = "examState";
    pub const EXAM_WORKSPACE: &str = "examWorkspacePath";
    pub const EXAM_ID: &str = "examId";
    pub const DRIVE_ID: &str = "driveId";
    pub const TIMER_START: &str = "timerStartTime";
    pub const TIMER_DURATION: &str = "timerDuration";
}

/// Backend de armazenamento bruto.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn clear(&self, key: &str) -> Result<(), StoreError>;
}

/// Backend em memória, usado nos testes.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// Backend em arquivo JSON.
///
/// Todo o mapa é mantido em memória e regravado a cada escrita: primeiro em
/// um arquivo temporário ao lado, depois renomeado por cima do original.
pub struct FileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl FileStore {
    /// Abre (ou cria vazio) o arquivo de estado em `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            Map::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &Map<String, Value>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// Fachada tipada sobre um [`KeyValueStore`] compartilhado.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KeyValueStore>,
}

impl Store {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Lê e desserializa `key`. Um valor com formato inesperado é tratado
    /// como ausente (e registrado), nunca como erro fatal.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(value) = self.backend.get(key)? else {
            return Ok(None);
        };
        if value.is_null() {
            return Ok(None);
        }
        match serde_json::from_value(value) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!(key, error = %e, "ignoring malformed persisted value");
                Ok(None)
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.backend.set(key, serde_json::to_value(value)?)
    }

    pub fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.backend.clear(key)
    }

    // --- identidade ---

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        self.get(keys::AUTH_TOKEN)
    }

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.set(keys::AUTH_TOKEN, &token)
    }

    pub fn exam_id(&self) -> Result<Option<String>, StoreError> {
        self.get(keys::EXAM_ID)
    }

    pub fn drive_id(&self) -> Result<Option<String>, StoreError> {
        self.get(keys::DRIVE_ID)
    }

    pub fn workspace(&self) -> Result<Option<PathBuf>, StoreError> {
        self.get(keys::EXAM_WORKSPACE)
    }

    /// Grava os identificadores de uma prova recém-iniciada.
    pub fn save_exam(&self, exam_id: &str, drive_id: &str, workspace: &Path) -> Result<(), StoreError> {
        self.set(keys::EXAM_WORKSPACE, &workspace)?;
        self.set(keys::EXAM_ID, &exam_id)?;
        self.set(keys::DRIVE_ID, &drive_id)
    }

    /// Apaga token, prova, drive e workspace. Continua mesmo que uma das
    /// chaves falhe, devolvendo o primeiro erro encontrado.
    pub fn clear_identity(&self) -> Result<(), StoreError> {
        let mut first_err = None;
        for key in [keys::EXAM_WORKSPACE, keys::EXAM_ID, keys::DRIVE_ID, keys::AUTH_TOKEN] {
            if let Err(e) = self.clear(key) {
                warn!(key, error = %e, "failed to clear persisted identity key");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
