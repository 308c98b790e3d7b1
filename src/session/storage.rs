//! Almacenamiento durable del token de sesión.


use std::path::{Path, PathBuf};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;


#[derive(Debug, Error)]
pub enum StorageError {
    #[error("error de E/S en {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archivo de token inválido en {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}


/// Persistencia del token entre ejecuciones del cliente.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, StorageError>;
    async fn save(&self, token: &str) -> Result<(), StorageError>;
    /// Elimina el token. Borrar un token inexistente no es un error.
    async fn clear(&self) -> Result<(), StorageError>;
}


#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
}


/// Guarda el token como JSON (`{"token": "..."}`) en un archivo.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}


impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io { path: self.path.clone(), source }
    }
}


#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let stored: StoredToken = serde_json::from_str(&content)
            .map_err(|source| StorageError::Parse { path: self.path.clone(), source })?;

        if stored.token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(stored.token))
    }

    async fn save(&self, token: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }

        let content = serde_json::to_string(&StoredToken { token: token.to_string() })
            .map_err(|source| StorageError::Parse { path: self.path.clone(), source })?;

        // Escritura atómica: archivo temporal y renombrado.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).await.map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).await.map_err(|e| self.io_error(e))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}


/// Almacenamiento en memoria, para sesiones efímeras.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}


impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: RwLock::new(Some(token.into())) }
    }
}


#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &str) -> Result<(), StorageError> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.token.write().await = None;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_means_no_token() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token.json"));

        store.save("jwt.abc").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("jwt.abc".to_string()));

        store.save("jwt.def").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("jwt.def".to_string()));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        assert!(!store.path().exists());

        // Idempotente.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileTokenStore::new(path);
        assert!(matches!(store.load().await, Err(StorageError::Parse { .. })));
    }

    #[tokio::test]
    async fn blank_token_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"token": "  "}"#).unwrap();

        let store = FileTokenStore::new(path);
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryTokenStore::with_token("t1");
        assert_eq!(store.load().await.unwrap(), Some("t1".to_string()));
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        store.save("t2").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("t2".to_string()));
    }
}
