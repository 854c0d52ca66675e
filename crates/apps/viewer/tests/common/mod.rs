#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use formats::TriangleMesh;
use formats::stl::encode_binary;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use skyline_viewer::{ApiError, ContributionsApi, ModelDownload, ViewerConfig, ViewerSession};
use streaming::{FetchError, MeshSource, ResourceLocator, UserIdentity};
use tokio::sync::oneshot;

type MeshReply = Result<Bytes, FetchError>;

#[derive(Default)]
struct State {
    user: Option<UserIdentity>,
    years: Vec<u32>,
    work: BTreeMap<u32, bool>,
    work_errors: BTreeMap<u32, ApiError>,
    import_errors: VecDeque<ApiError>,
    /// Mesh requests answer immediately with this when set.
    auto_mesh: Option<MeshReply>,
    waiting: Vec<(ResourceLocator, oneshot::Sender<MeshReply>)>,
    mesh_requests: Vec<String>,
    api_calls: Vec<String>,
}

/// In-memory stand-in for the contributions API.
///
/// Mesh requests are parked until the test answers them with
/// [`ScriptedApi::answer`], unless an automatic reply is configured.
#[derive(Clone, Default)]
pub struct ScriptedApi {
    state: Arc<Mutex<State>>,
}

impl ScriptedApi {
    pub fn signed_in(user: &str, years: &[u32]) -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock();
            state.user = Some(UserIdentity::new(user));
            state.years = years.to_vec();
        }
        api
    }

    pub fn set_work_available(&self, year: u32, available: bool) {
        self.state.lock().work.insert(year, available);
    }

    pub fn fail_work_available(&self, year: u32, err: ApiError) {
        self.state.lock().work_errors.insert(year, err);
    }

    pub fn fail_next_import(&self, err: ApiError) {
        self.state.lock().import_errors.push_back(err);
    }

    pub fn auto_answer(&self, reply: MeshReply) {
        self.state.lock().auto_mesh = Some(reply);
    }

    /// Answer the oldest parked request for `locator`.
    pub fn answer(&self, locator: &ResourceLocator, reply: MeshReply) {
        let mut state = self.state.lock();
        let index = state
            .waiting
            .iter()
            .position(|(l, _)| l == locator)
            .unwrap_or_else(|| panic!("no parked request for {locator}"));
        let (_, tx) = state.waiting.remove(index);
        let _ = tx.send(reply);
    }

    pub fn mesh_requests(&self) -> Vec<String> {
        self.state.lock().mesh_requests.clone()
    }

    pub fn api_calls(&self) -> Vec<String> {
        self.state.lock().api_calls.clone()
    }

    pub fn session(&self) -> ViewerSession {
        let api: Arc<dyn ContributionsApi> = Arc::new(self.clone());
        let source: Arc<dyn MeshSource> = Arc::new(self.clone());
        ViewerSession::new(api, source, &ViewerConfig::default())
    }

    fn call(&self, name: String) {
        self.state.lock().api_calls.push(name);
    }
}

impl ContributionsApi for ScriptedApi {
    fn current_user(&self) -> BoxFuture<'_, Result<Option<UserIdentity>, ApiError>> {
        self.call("current_user".to_string());
        let user = self.state.lock().user.clone();
        async move { Ok(user) }.boxed()
    }

    fn years(&self) -> BoxFuture<'_, Result<Vec<u32>, ApiError>> {
        self.call("years".to_string());
        let years = self.state.lock().years.clone();
        async move { Ok(years) }.boxed()
    }

    fn work_available(&self, year: u32) -> BoxFuture<'_, Result<bool, ApiError>> {
        self.call(format!("work_available/{year}"));
        let state = self.state.lock();
        let result = match state.work_errors.get(&year) {
            Some(err) => Err(err.clone()),
            None => Ok(state.work.get(&year).copied().unwrap_or(false)),
        };
        async move { result }.boxed()
    }

    fn import_year(&self, year: u32) -> BoxFuture<'_, Result<(), ApiError>> {
        self.call(format!("import/{year}"));
        let mut state = self.state.lock();
        let result = match state.import_errors.pop_front() {
            Some(err) => Err(err),
            None => {
                if !state.years.contains(&year) {
                    state.years.push(year);
                }
                Ok(())
            }
        };
        async move { result }.boxed()
    }

    fn download_model(
        &self,
        locator: &ResourceLocator,
    ) -> BoxFuture<'_, Result<ModelDownload, ApiError>> {
        self.call(format!("download {locator}"));
        async move {
            Ok(ModelDownload {
                bytes: skyline_stl(3.0),
                filename: None,
            })
        }
        .boxed()
    }
}

impl MeshSource for ScriptedApi {
    fn fetch(&self, locator: &ResourceLocator) -> BoxFuture<'static, MeshReply> {
        let mut state = self.state.lock();
        state.mesh_requests.push(locator.path_and_query());
        if let Some(reply) = state.auto_mesh.clone() {
            return async move { reply }.boxed();
        }
        let (tx, rx) = oneshot::channel();
        state.waiting.push((locator.clone(), tx));
        async move {
            rx.await.unwrap_or_else(|_| {
                Err(FetchError::Transport {
                    message: "request dropped".to_string(),
                })
            })
        }
        .boxed()
    }
}

/// A one-tower skyline, `height` units tall.
pub fn skyline_stl(height: f32) -> Bytes {
    let mut mesh = TriangleMesh::new();
    mesh.push_triangle(
        [0.0, -1.0, 0.0],
        [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 0.0, height]],
    );
    mesh.push_triangle(
        [0.0, -1.0, 0.0],
        [[0.0, 0.0, 0.0], [10.0, 0.0, height], [0.0, 0.0, height]],
    );
    Bytes::from(encode_binary(&mesh))
}
