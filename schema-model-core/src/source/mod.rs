//! Data sources and fetch-and-refresh.
//!
//! A [`ModelSource`] is where a model's records live. Implementors override
//! the retrieval methods ([`ModelSource::fetch_raw`],
//! [`ModelSource::fetch_collection_raw`]) and the persistence methods
//! ([`ModelSource::save`], [`ModelSource::delete`]); every method that is not
//! overridden fails with [`ModelError::NotImplemented`].
//!
//! [`ModelSource::fetch`] and [`ModelSource::fetch_collection`] build on the
//! retrieval methods and return a [`Fetched`]: a reactive handle plus a
//! `refresh()` that reloads with the same arguments into the same handle.

mod memory;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::{Instance, ModelType};
use crate::reactive::Reactive;

pub use memory::MemorySource;

type Loader<T> = Arc<dyn Fn() -> BoxFuture<'static, ModelResult<T>> + Send + Sync>;

/// Reactive data plus a way to reload it.
pub struct Fetched<T> {
    data: Reactive<T>,
    loader: Loader<T>,
}

impl<T> Clone for Fetched<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loader: Arc::clone(&self.loader),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Fetched<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetched").field("data", &self.data).finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Fetched<T> {
    pub fn data(&self) -> &Reactive<T> {
        &self.data
    }

    /// Reloads and replaces the contents of [`Fetched::data`]. The handle
    /// itself stays the same, so existing subscribers see the new value.
    ///
    /// Concurrent refreshes are not sequenced; the last one to finish wins.
    pub async fn refresh(&self) -> ModelResult<()> {
        let fresh = (self.loader)().await?;
        self.data.set(fresh);
        Ok(())
    }
}

/// Calls `loader` once for the initial value and keeps it for `refresh()`.
pub async fn fetch_and_refresh<T, F, Fut>(loader: F) -> ModelResult<Fetched<T>>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ModelResult<T>> + Send + 'static,
{
    let loader: Loader<T> = Arc::new(move || loader().boxed());
    let initial = loader().await?;
    Ok(Fetched {
        data: Reactive::new(initial),
        loader,
    })
}

/// Backend access for one model type.
///
/// Every method has a default body that reports it as not implemented;
/// a source overrides the ones its backend supports.
pub trait ModelSource: Send + Sync + 'static {
    /// The type records are materialized as.
    fn model(&self) -> &Arc<ModelType>;

    /// Retrieves the raw record with the given id.
    fn fetch_raw(&self, _id: &Value) -> impl Future<Output = ModelResult<Value>> + Send {
        async { Err(ModelError::NotImplemented { method: "fetch" }) }
    }

    /// Retrieves all raw records as a JSON array.
    fn fetch_collection_raw(&self) -> impl Future<Output = ModelResult<Value>> + Send {
        async {
            Err(ModelError::NotImplemented {
                method: "fetch_collection",
            })
        }
    }

    /// Persists an instance and returns it as stored by the backend.
    fn save(&self, _instance: &Instance) -> impl Future<Output = ModelResult<Instance>> + Send {
        async { Err(ModelError::NotImplemented { method: "save" }) }
    }

    /// Removes an instance from the backend.
    fn delete(&self, _instance: &Instance) -> impl Future<Output = ModelResult<()>> + Send {
        async { Err(ModelError::NotImplemented { method: "delete" }) }
    }

    /// Fetches one record as a reactive instance with `refresh()`.
    fn fetch(
        self: &Arc<Self>,
        id: impl Into<Value>,
    ) -> impl Future<Output = ModelResult<Fetched<Instance>>> + Send
    where
        Self: Sized,
    {
        let source = Arc::clone(self);
        let id = id.into();
        fetch_and_refresh(move || {
            let source = Arc::clone(&source);
            let id = id.clone();
            async move {
                tracing::debug!(model = %source.model().name(), %id, "fetching record");
                let raw = source.fetch_raw(&id).await?;
                source.model().construct(&raw)
            }
        })
    }

    /// Fetches all records as a reactive collection with `refresh()`.
    fn fetch_collection(
        self: &Arc<Self>,
    ) -> impl Future<Output = ModelResult<Fetched<Vec<Instance>>>> + Send
    where
        Self: Sized,
    {
        let source = Arc::clone(self);
        fetch_and_refresh(move || {
            let source = Arc::clone(&source);
            async move {
                tracing::debug!(model = %source.model().name(), "fetching collection");
                let raw = source.fetch_collection_raw().await?;
                source.model().construct_collection(&raw)
            }
        })
    }
}
