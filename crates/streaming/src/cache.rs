use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use foundation::BoundingSphere;
use formats::{StlError, TriangleMesh};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::request::ResourceLocator;
use crate::residency::LoadState;
use crate::source::{FetchError, MeshSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Fetch(FetchError),
    Decode(StlError),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Fetch(e) => write!(f, "mesh fetch failed: {e}"),
            LoadError::Decode(e) => write!(f, "mesh decode failed: {e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Fetch(e) => Some(e),
            LoadError::Decode(e) => Some(e),
        }
    }
}

/// A decoded mesh together with what the viewer derives from it.
///
/// Entries are immutable once built; a refetch produces a new `CachedMesh`
/// with a higher `generation`.
#[derive(Debug)]
pub struct CachedMesh {
    pub locator: ResourceLocator,
    pub generation: u64,
    pub geometry: TriangleMesh,
    pub bounding_sphere: BoundingSphere,
    pub content_hash: String,
    pub payload_len: usize,
}

impl CachedMesh {
    pub fn decode(
        locator: ResourceLocator,
        generation: u64,
        payload: &[u8],
    ) -> Result<Self, StlError> {
        let geometry = formats::decode_stl(payload)?;
        let bounding_sphere = geometry.bounding_sphere();
        Ok(Self {
            locator,
            generation,
            geometry,
            bounding_sphere,
            content_hash: formats::content_hash(payload),
            payload_len: payload.len(),
        })
    }
}

pub type LoadResult = Result<Arc<CachedMesh>, LoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

enum Slot {
    Pending(SharedLoad),
    Ready(Arc<CachedMesh>),
    Failed(LoadError),
}

struct CacheEntry {
    generation: u64,
    slot: Slot,
}

#[derive(Default)]
struct CacheInner {
    entries: BTreeMap<ResourceLocator, CacheEntry>,
    next_generation: u64,
    fetches: u64,
}

/// Mesh cache keyed by resource locator.
///
/// - At most one fetch is in flight per locator; concurrent loads attach to
///   the pending entry.
/// - Ready entries are served without touching the network until they are
///   invalidated.
/// - Failed entries are retried on the next load.
/// - A result is only written back if its entry still has the generation it
///   was issued for, so an evicted entry is never resurrected by a late
///   response.
/// - Inside a tokio runtime each load runs as its own task, so it settles
///   whether or not anyone still holds a handle. Outside one, loads advance
///   only when a handle is polled or awaited.
#[derive(Clone)]
pub struct MeshCache {
    inner: Arc<Mutex<CacheInner>>,
    source: Arc<dyn MeshSource>,
}

impl std::fmt::Debug for MeshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MeshCache")
            .field("entries", &inner.entries.len())
            .field("fetches", &inner.fetches)
            .finish()
    }
}

impl MeshCache {
    pub fn new(source: Arc<dyn MeshSource>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Number of fetches issued over the lifetime of the cache.
    pub fn fetch_count(&self) -> u64 {
        self.inner.lock().fetches
    }

    pub fn state(&self, locator: &ResourceLocator) -> Option<LoadState> {
        let inner = self.inner.lock();
        inner.entries.get(locator).map(|e| match e.slot {
            Slot::Pending(_) => LoadState::Pending,
            Slot::Ready(_) => LoadState::Ready,
            Slot::Failed(_) => LoadState::Failed,
        })
    }

    pub fn error(&self, locator: &ResourceLocator) -> Option<LoadError> {
        match &self.inner.lock().entries.get(locator)?.slot {
            Slot::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Return a handle for `locator`, issuing a fetch only if there is no
    /// pending or ready entry for it.
    pub fn load(&self, locator: &ResourceLocator) -> MeshHandle {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get(locator) {
            let state = match &entry.slot {
                Slot::Ready(mesh) => Some(HandleState::Ready(mesh.clone())),
                Slot::Pending(load) => Some(HandleState::Pending(load.clone())),
                Slot::Failed(err) => {
                    debug!(%locator, error = %err, "retrying failed mesh load");
                    None
                }
            };
            if let Some(state) = state {
                return MeshHandle {
                    locator: locator.clone(),
                    generation: entry.generation,
                    state,
                };
            }
        }

        inner.next_generation += 1;
        inner.fetches += 1;
        let generation = inner.next_generation;
        info!(%locator, generation, "mesh fetch issued");

        let fetch = self.source.fetch(locator);
        let load = complete_load(
            Arc::downgrade(&self.inner),
            locator.clone(),
            generation,
            fetch,
        )
        .boxed()
        .shared();

        inner.entries.insert(
            locator.clone(),
            CacheEntry {
                generation,
                slot: Slot::Pending(load.clone()),
            },
        );

        drop(inner);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(load.clone().map(drop));
        }

        MeshHandle {
            locator: locator.clone(),
            generation,
            state: HandleState::Pending(load),
        }
    }

    pub fn invalidate(&self, locator: &ResourceLocator) -> bool {
        let removed = self.inner.lock().entries.remove(locator).is_some();
        if removed {
            info!(%locator, "invalidated cached mesh");
        }
        removed
    }

    /// Evict every entry whose locator encodes `year`.
    pub fn invalidate_year(&self, year: u32) -> Vec<ResourceLocator> {
        let mut inner = self.inner.lock();
        let evicted: Vec<ResourceLocator> = inner
            .entries
            .keys()
            .filter(|l| l.year() == Some(year))
            .cloned()
            .collect();
        for locator in &evicted {
            inner.entries.remove(locator);
        }
        if !evicted.is_empty() {
            info!(year, count = evicted.len(), "invalidated cached meshes for year");
        }
        evicted
    }
}

async fn complete_load(
    cache: Weak<Mutex<CacheInner>>,
    locator: ResourceLocator,
    generation: u64,
    fetch: BoxFuture<'static, Result<Bytes, FetchError>>,
) -> LoadResult {
    let result = match fetch.await {
        Ok(payload) => CachedMesh::decode(locator.clone(), generation, &payload)
            .map(Arc::new)
            .map_err(LoadError::Decode),
        Err(err) => Err(LoadError::Fetch(err)),
    };

    match &result {
        Ok(mesh) => info!(
            %locator,
            generation,
            triangles = mesh.geometry.triangle_count(),
            "mesh ready"
        ),
        Err(err) => warn!(%locator, generation, error = %err, "mesh load failed"),
    }

    if let Some(cache) = cache.upgrade() {
        let mut inner = cache.lock();
        match inner.entries.get_mut(&locator) {
            Some(entry) if entry.generation == generation => {
                entry.slot = match &result {
                    Ok(mesh) => Slot::Ready(mesh.clone()),
                    Err(err) => Slot::Failed(err.clone()),
                };
            }
            _ => debug!(%locator, generation, "discarding result for evicted entry"),
        }
    }

    result
}

#[derive(Clone)]
enum HandleState {
    Pending(SharedLoad),
    Ready(Arc<CachedMesh>),
    Failed(LoadError),
}

/// Consumer view of one cache entry.
///
/// The render loop calls [`MeshHandle::poll_state`] once per frame; async
/// callers can [`MeshHandle::wait`] instead. Neither issues another fetch.
/// Dropping a handle does not cancel its load.
#[derive(Clone)]
pub struct MeshHandle {
    locator: ResourceLocator,
    generation: u64,
    state: HandleState,
}

impl std::fmt::Debug for MeshHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshHandle")
            .field("locator", &self.locator)
            .field("generation", &self.generation)
            .field("state", &self.state())
            .finish()
    }
}

impl MeshHandle {
    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> LoadState {
        match &self.state {
            HandleState::Pending(load) => match load.peek() {
                None => LoadState::Pending,
                Some(Ok(_)) => LoadState::Ready,
                Some(Err(_)) => LoadState::Failed,
            },
            HandleState::Ready(_) => LoadState::Ready,
            HandleState::Failed(_) => LoadState::Failed,
        }
    }

    /// Drive the pending load without blocking and report where it stands.
    pub fn poll_state(&mut self) -> LoadState {
        if let HandleState::Pending(load) = &self.state {
            if let Some(result) = load.clone().now_or_never() {
                self.state = result.map_or_else(HandleState::Failed, HandleState::Ready);
            }
        }
        self.state()
    }

    pub fn mesh(&self) -> Option<Arc<CachedMesh>> {
        match &self.state {
            HandleState::Ready(mesh) => Some(mesh.clone()),
            HandleState::Pending(load) => match load.peek() {
                Some(Ok(mesh)) => Some(mesh.clone()),
                _ => None,
            },
            HandleState::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<LoadError> {
        match &self.state {
            HandleState::Failed(err) => Some(err.clone()),
            HandleState::Pending(load) => match load.peek() {
                Some(Err(err)) => Some(err.clone()),
                _ => None,
            },
            HandleState::Ready(_) => None,
        }
    }

    pub async fn wait(self) -> LoadResult {
        match self.state {
            HandleState::Pending(load) => load.await,
            HandleState::Ready(mesh) => Ok(mesh),
            HandleState::Failed(err) => Err(err),
        }
    }
}
