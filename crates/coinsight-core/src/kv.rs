//! Key-value persistence used for policy snapshots.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PolicyError;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PolicyError>> + Send + 'a>>;

/// Async string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get_item<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<String>>;

    fn set_item<'a>(&'a self, name: &'a str, value: String) -> StoreFuture<'a, ()>;

    fn remove_item<'a>(&'a self, name: &'a str) -> StoreFuture<'a, ()>;
}

/// Ephemeral store for tests and `--memory` runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.items.read().await.get(name).cloned()) })
    }

    fn set_item<'a>(&'a self, name: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.items.write().await.insert(name.to_owned(), value);
            Ok(())
        })
    }

    fn remove_item<'a>(&'a self, name: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.items.write().await.remove(name);
            Ok(())
        })
    }
}

/// One JSON file per key under a directory.
///
/// Each write stages into its own uniquely named temp file and renames it over
/// the target, so concurrent writers never share a staging file.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            let path = self.path_for(name);
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
                Err(error) => Err(io_error("read", &path, &error)),
            }
        })
    }

    fn set_item<'a>(&'a self, name: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|error| io_error("create", &self.dir, &error))?;

            let path = self.path_for(name);
            let staging = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
            if let Err(error) = tokio::fs::write(&staging, value).await {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(io_error("write", &staging, &error));
            }
            if let Err(error) = tokio::fs::rename(&staging, &path).await {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(io_error("rename", &path, &error));
            }
            Ok(())
        })
    }

    fn remove_item<'a>(&'a self, name: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = self.path_for(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
                Err(error) => Err(io_error("remove", &path, &error)),
            }
        })
    }
}

fn io_error(action: &str, path: &Path, error: &std::io::Error) -> PolicyError {
    PolicyError::Store(format!("failed to {action} '{}': {error}", path.display()))
}
