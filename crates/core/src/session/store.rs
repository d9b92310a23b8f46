//! Session persistence behind an opaque get/set capability.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::SerializedSession;
use crate::error::{Error, Result};

/// Opaque key-value persistence for serialized sessions.
///
/// Expiry is never enforced by the store itself; validity is evaluated
/// in-process against the marker cookie. Implementations only need
/// last-write-wins semantics since sessions are replaced wholesale.
#[async_trait]
pub trait SessionStore: Send + Sync {
	/// Loads the session stored under `key`, if any.
	async fn get(&self, key: &str) -> Result<Option<SerializedSession>>;

	/// Replaces the session stored under `key`.
	async fn set(&self, key: &str, session: &SerializedSession) -> Result<()>;
}

/// File-backed store keeping one pretty-printed JSON document per key.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
	dir: PathBuf,
}

impl FileSessionStore {
	/// Creates a store rooted at `dir`; the directory is created lazily on
	/// first write.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Returns the on-disk path backing `key`.
	pub fn path_for(&self, key: &str) -> PathBuf {
		self.dir.join(format!("{key}.json"))
	}
}

#[async_trait]
impl SessionStore for FileSessionStore {
	async fn get(&self, key: &str) -> Result<Option<SerializedSession>> {
		read_session_file(&self.path_for(key))
	}

	async fn set(&self, key: &str, session: &SerializedSession) -> Result<()> {
		let path = self.path_for(key);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let json = serde_json::to_string_pretty(session)?;
		std::fs::write(&path, json)?;
		Ok(())
	}
}

/// Loads and decodes one session file, treating a missing file as `None`.
pub fn read_session_file(path: &Path) -> Result<Option<SerializedSession>> {
	let content = match std::fs::read_to_string(path) {
		Ok(content) => content,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(err) => return Err(err.into()),
	};
	let session = serde_json::from_str(&content)
		.map_err(|e| Error::Store(format!("corrupt session file {}: {e}", path.display())))?;
	Ok(Some(session))
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	inner: Mutex<HashMap<String, SerializedSession>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
	async fn get(&self, key: &str) -> Result<Option<SerializedSession>> {
		Ok(self.inner.lock().get(key).cloned())
	}

	async fn set(&self, key: &str, session: &SerializedSession) -> Result<()> {
		let _ = self.inner.lock().insert(key.to_string(), session.clone());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;
	use crate::session::{Cookie, MARKER_COOKIE};

	fn sample_session() -> SerializedSession {
		SerializedSession::new(vec![Cookie {
			name: MARKER_COOKIE.to_string(),
			value: "token".to_string(),
			domain: Some(".example.com".to_string()),
			path: Some("/".to_string()),
			expires: Some(4_102_444_800.0),
			http_only: true,
			secure: true,
			session: false,
		}])
	}

	#[tokio::test]
	async fn file_store_round_trips_sessions() {
		let tmp = TempDir::new().unwrap();
		let store = FileSessionStore::new(tmp.path().join("sessions"));

		assert!(store.get("award").await.unwrap().is_none());

		let session = sample_session();
		store.set("award", &session).await.unwrap();

		let loaded = store.get("award").await.unwrap().unwrap();
		assert_eq!(loaded, session);
	}

	#[tokio::test]
	async fn file_store_replaces_wholesale() {
		let tmp = TempDir::new().unwrap();
		let store = FileSessionStore::new(tmp.path());

		store.set("award", &sample_session()).await.unwrap();
		let replacement = SerializedSession::new(Vec::new());
		store.set("award", &replacement).await.unwrap();

		let loaded = store.get("award").await.unwrap().unwrap();
		assert!(loaded.cookies.is_empty());
	}

	#[tokio::test]
	async fn corrupt_file_reports_store_error() {
		let tmp = TempDir::new().unwrap();
		let store = FileSessionStore::new(tmp.path());
		std::fs::write(store.path_for("award"), "not json").unwrap();

		let err = store.get("award").await.unwrap_err();
		assert!(matches!(err, Error::Store(_)));
	}

	#[tokio::test]
	async fn memory_store_round_trips_sessions() {
		let store = MemorySessionStore::default();
		assert!(store.get("award").await.unwrap().is_none());
		let session = sample_session();
		store.set("award", &session).await.unwrap();
		assert_eq!(store.get("award").await.unwrap(), Some(session));
	}
}
