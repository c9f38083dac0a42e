//! Streaming: ring-scan controller, background mesh workers, bind
//! throttling and the floating origin.

pub mod controller;
pub mod limiter;
pub mod origin;
pub mod workers;

pub use controller::StreamingController;
pub use limiter::LoadLimiter;
pub use origin::{AnchoredPosition, FloatingOrigin, OriginAware};
pub use workers::{BuildJob, BuildResult, MeshWorkerPool};
