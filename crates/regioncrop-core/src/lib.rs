//! Regioncrop Core - Interactive crop regions and rotation-aware cropping
//!
//! This crate lets a user drag a crop rectangle over a zoomed and panned
//! image and turns the committed rectangle into output pixels, compensating
//! for the rotation stored with the source.
//!
//! The pieces, leaf first:
//!
//! - [`geometry`]: points, rectangles and affine matrices
//! - [`view`]: image-to-screen mapping with zoom, pan and animated zoom
//! - [`transform`]: rotation compensation between image and source space
//! - [`region`]: the crop rectangle state machine (hit-test, move, grow)
//! - [`interaction`]: pointer handling that drives regions and the view
//! - [`pipeline`]: partial-region or full-decode cropping and output sizing
//! - [`session`]: the host-facing facade tying it all together
//!
//! Decoding, encoding, host traits and dispatchers live in [`decode`],
//! [`encode`], [`host`] and [`dispatch`].

pub mod config;
pub mod decode;
pub mod dispatch;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod host;
pub mod interaction;
pub mod pipeline;
pub mod region;
pub mod session;
pub mod transform;
pub mod view;

pub use config::{OutputSpec, SessionConfig};
pub use decode::{DecodeError, DecodedImage, FilterType, Image};
pub use dispatch::InlineDispatcher;
#[cfg(feature = "threads")]
pub use dispatch::RayonDispatcher;
pub use error::CropError;
pub use geometry::{Affine, IntRect, Point, Rect};
pub use pipeline::{CommitOutcome, CropOutput, CropStrategy};
pub use region::{AspectRatio, CropRegion, Edge, ModifyMode};
pub use session::{CommitStatus, CropSession, CropSessionBuilder, SessionEvent, SessionState};
pub use transform::Rotation;
pub use view::ViewTransform;
