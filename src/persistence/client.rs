use futures::channel::oneshot;
use std::sync::Arc;
use thiserror::Error;

use super::{DrawingId, DrawingStore, LoadResponse, SaveRequest, SaveResponse, StoreError, StoreResult, VersionResponse};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The session has no drawing to save to or load from
    #[error("No drawing ID found.")]
    MissingDrawingId,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The worker went away without answering
    #[error("Request was dropped before it completed")]
    Dropped,
}

/// A store request running in the background.
///
/// There is no cancellation and no ordering between requests: whichever
/// finishes is reported by `poll` on the next frame.
#[derive(Debug)]
pub struct PendingRequest<T> {
    rx: oneshot::Receiver<Result<T, ClientError>>,
}

impl<T> PendingRequest<T> {
    /// Non-blocking check, for calling once per frame.
    pub fn poll(&mut self) -> Option<Result<T, ClientError>> {
        match self.rx.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(ClientError::Dropped)),
        }
    }

    pub async fn wait(self) -> Result<T, ClientError> {
        self.rx.await.unwrap_or(Err(ClientError::Dropped))
    }
}

/// Runs [`DrawingStore`] calls off the input thread.
#[derive(Clone)]
pub struct PersistenceClient {
    store: Arc<dyn DrawingStore>,
}

impl std::fmt::Debug for PersistenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceClient").finish_non_exhaustive()
    }
}

impl PersistenceClient {
    pub fn new(store: Arc<dyn DrawingStore>) -> Self {
        Self { store }
    }

    pub fn create(&self, title: String, width: u32, height: u32) -> PendingRequest<DrawingId> {
        self.spawn("create", move |store| store.create(&title, width, height))
    }

    pub fn save(&self, id: Option<DrawingId>, request: SaveRequest) -> Result<PendingRequest<SaveResponse>, ClientError> {
        let id = id.ok_or(ClientError::MissingDrawingId)?;
        Ok(self.spawn("save", move |store| store.save(id, &request)))
    }

    pub fn load(&self, id: Option<DrawingId>) -> Result<PendingRequest<LoadResponse>, ClientError> {
        let id = id.ok_or(ClientError::MissingDrawingId)?;
        Ok(self.spawn("load", move |store| store.load(id)))
    }

    pub fn create_version(&self, id: Option<DrawingId>) -> Result<PendingRequest<VersionResponse>, ClientError> {
        let id = id.ok_or(ClientError::MissingDrawingId)?;
        Ok(self.spawn("version", move |store| store.create_version(id)))
    }

    fn spawn<T, F>(&self, name: &'static str, request: F) -> PendingRequest<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DrawingStore) -> StoreResult<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let store = Arc::clone(&self.store);
        std::thread::spawn(move || {
            let result = request(store.as_ref()).map_err(ClientError::from);
            if let Err(err) = &result {
                log::warn!("Drawing {name} request failed: {err}");
            }
            // The receiver may already be gone; nobody is waiting then.
            let _ = tx.send(result);
        });
        PendingRequest { rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{CanvasData, DrawingMetadata, FileStore};
    use futures::executor::block_on;

    fn client() -> (PersistenceClient, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("sketch_canvas_client_{}", uuid::Uuid::new_v4()));
        (PersistenceClient::new(Arc::new(FileStore::new(&dir))), dir)
    }

    fn empty_save() -> SaveRequest {
        SaveRequest {
            canvas_data: CanvasData::default(),
            width: 10,
            height: 10,
            is_completed: false,
            metadata: DrawingMetadata::default(),
        }
    }

    #[test]
    fn missing_drawing_id_is_rejected_up_front() {
        let (client, _) = client();
        assert!(matches!(client.save(None, empty_save()), Err(ClientError::MissingDrawingId)));
        assert!(matches!(client.load(None), Err(ClientError::MissingDrawingId)));
        assert!(matches!(client.create_version(None), Err(ClientError::MissingDrawingId)));
    }

    #[test]
    fn requests_complete_in_the_background() {
        let (client, dir) = client();
        let id = block_on(client.create("Untitled Drawing".into(), 10, 10).wait()).unwrap();

        let saved = block_on(client.save(Some(id), empty_save()).unwrap().wait()).unwrap();
        assert!(saved.success);

        let loaded = block_on(client.load(Some(id)).unwrap().wait()).unwrap();
        assert_eq!(loaded.width, Some(10));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn store_failures_surface_as_errors() {
        let (client, _) = client();
        let result = block_on(client.load(Some(DrawingId::new())).unwrap().wait());
        assert!(matches!(result, Err(ClientError::Store(StoreError::NotFound(_)))));
    }
}
