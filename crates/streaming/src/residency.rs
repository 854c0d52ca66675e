/// Observable lifecycle of a cached mesh.
///
/// `Pending → Ready` on success, `Pending → Failed` on fetch or decode
/// failure. A failed entry is retried by the next load of the same locator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready,
    Failed,
}
