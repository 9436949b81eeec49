//! Preview rendering for generated candidates.
//!
//! Every candidate gets *some* image. The [`PreviewPipeline`] tries, in
//! order, the local engine at normal size, the engine again at high
//! resolution, an optional remote renderer for heavy diagrams, and finally
//! a synthetic schematic that cannot fail. Results are kept in a short-lived
//! [`PreviewCache`].

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod outcome;
pub mod pipeline;
pub mod raster;
pub mod remote;
pub mod svg;
pub mod synthetic;

pub use cache::PreviewCache;
pub use config::PreviewConfig;
pub use engine::{EngineRenderer, PreviewRenderer};
pub use error::RenderError;
pub use outcome::{ImageFormat, PreviewImage, PreviewOutcome, PreviewTier, RenderSize};
pub use pipeline::PreviewPipeline;
pub use remote::{HttpRemoteRenderer, RemoteRenderer};
