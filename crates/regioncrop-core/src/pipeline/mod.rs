//! Turning a committed crop rectangle into output pixels.
//!
//! # Strategies
//!
//! - **Partial region**: when the host can re-open the source and provides a
//!   [`RegionDecoder`], only the selected rectangle is decoded. The rectangle
//!   is mapped into source-encoded space first, and the decoded pixels keep
//!   the source orientation; the output carries the rotation still to apply.
//! - **Full decode**: the in-memory image is drawn through the display
//!   rotation and a crop transform into a fresh buffer. The result is
//!   upright. Every allocation the job makes afterwards is checked before
//!   drawing, while the source can still be handed back.
//!
//! Both produce identical pixels once the partial result is oriented.
//!
//! A [`CropJob`] owns everything it needs, so it can run on any thread; it
//! reports back with a single [`CommitOutcome`] value.

mod draw;
mod output;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::OutputSpec;
use crate::decode::{DecodeError, DecodedImage, Image};
use crate::encode::write_jpeg;
use crate::error::CropError;
use crate::geometry::{Affine, IntRect, Rect};
use crate::host::{RegionDecoder, SinkProvider, SourceProvider};
use crate::transform::{display_matrix, rotate_image, to_source_space, Rotation};

pub use draw::draw_transformed;
pub use output::{center_into, finish, planned_size};

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropStrategy {
    PartialRegion,
    FullDecode,
}

/// Where the job gets its pixels from.
pub enum CropSource {
    /// Re-open the stream and decode only the crop rectangle.
    Region {
        source: Arc<dyn SourceProvider>,
        decoder: Arc<dyn RegionDecoder>,
    },
    /// Draw from the already decoded image.
    Full(Image),
}

impl CropSource {
    pub fn strategy(&self) -> CropStrategy {
        match self {
            CropSource::Region { .. } => CropStrategy::PartialRegion,
            CropSource::Full(_) => CropStrategy::FullDecode,
        }
    }
}

impl fmt::Debug for CropSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropSource::Region { .. } => f.write_str("CropSource::Region"),
            CropSource::Full(image) => f
                .debug_tuple("CropSource::Full")
                .field(&image.source_size())
                .finish(),
        }
    }
}

/// Final cropped pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropOutput {
    pub image: DecodedImage,
    /// Clockwise rotation still needed to show `image` upright. Always
    /// zero for the full-decode path.
    pub rotation: Rotation,
    /// Passed through from the output spec for downstream masking.
    pub circular: bool,
    /// The committed rectangle in image space.
    pub crop: IntRect,
    pub strategy: CropStrategy,
}

impl CropOutput {
    /// The pixels rotated upright.
    pub fn oriented(self) -> DecodedImage {
        rotate_image(self.image, self.rotation)
    }
}

/// What a job hands back to the session.
#[derive(Debug)]
pub enum CommitOutcome {
    Completed {
        output: CropOutput,
        /// Result of writing to the sink, if one was configured.
        sink: Option<Result<(), CropError>>,
    },
    Failed {
        error: CropError,
        /// The in-memory image, returned by the full-decode path so the
        /// session can commit again.
        recovered: Option<Image>,
    },
}

/// One commit, ready to run.
pub struct CropJob {
    pub crop: IntRect,
    pub rotation: Rotation,
    pub output: OutputSpec,
    pub memory_budget: Option<usize>,
    pub source: CropSource,
    pub sink: Option<Arc<dyn SinkProvider>>,
}

impl CropJob {
    pub fn run(self) -> CommitOutcome {
        let CropJob {
            crop,
            rotation,
            output: spec,
            memory_budget,
            source,
            sink,
        } = self;
        let strategy = source.strategy();
        info!(%crop, rotation = rotation.degrees(), ?strategy, "running crop");

        let cropped = match source {
            CropSource::Region { source, decoder } => {
                crop_partial(source.as_ref(), decoder.as_ref(), &crop, rotation)
                    .map(|pixels| (pixels, rotation))
                    .map_err(|error| (error, None))
            }
            CropSource::Full(image) => crop_full(image, &crop, &spec, memory_budget)
                .map(|pixels| (pixels, Rotation::Deg0))
                .map_err(|(error, image)| (error, Some(image))),
        };

        let (pixels, remaining) = match cropped {
            Ok(v) => v,
            Err((error, recovered)) => {
                warn!(%error, "crop failed");
                return CommitOutcome::Failed { error, recovered };
            }
        };

        // The full-decode source is gone by now; the session treats a
        // failure here as final when it has nothing left to crop from.
        let image = match finish(pixels, &spec, remaining) {
            Ok(image) => image,
            Err(error) => {
                warn!(%error, "output sizing failed");
                return CommitOutcome::Failed {
                    error,
                    recovered: None,
                };
            }
        };

        let sink = sink.map(|sink| write_output(&image, spec.quality, sink.as_ref()));
        if let Some(Err(error)) = &sink {
            warn!(%error, "writing output failed");
        }

        debug!(width = image.width, height = image.height, "crop finished");
        CommitOutcome::Completed {
            output: CropOutput {
                image,
                rotation: remaining,
                circular: spec.circular,
                crop,
                strategy,
            },
            sink,
        }
    }
}

/// Decode only `crop` (image space) from a freshly opened stream.
///
/// The returned pixels are in source orientation.
pub fn crop_partial(
    source: &dyn SourceProvider,
    decoder: &dyn RegionDecoder,
    crop: &IntRect,
    rotation: Rotation,
) -> Result<DecodedImage, CropError> {
    let stream = source
        .open()
        .map_err(|e| CropError::SourceRead(DecodeError::IoError(e)))?;
    let mut reader = decoder.open(stream)?;
    let (width, height) = reader.dimensions();

    let rect = to_source_space(crop, rotation, width, height);
    let out_of_bounds = || CropError::RegionOutOfBounds {
        rect,
        width,
        height,
        rotation: rotation.degrees(),
    };
    if !rect.fits_within(width, height) {
        return Err(out_of_bounds());
    }

    debug!(%rect, width, height, "decoding region");
    reader.decode_region(&rect).map_err(|e| match e {
        DecodeError::RegionOutsideImage { .. } => out_of_bounds(),
        other => other.into(),
    })
}

/// Draw `crop` (image space) out of the decoded image into an upright buffer.
///
/// The source buffer is dropped as soon as drawing is done. Before that, the
/// buffer [`finish`] will need under `spec` is checked against the budget and
/// the allocator, so sizing failures hand the source back untouched.
pub fn crop_full(
    image: Image,
    crop: &IntRect,
    spec: &OutputSpec,
    memory_budget: Option<usize>,
) -> Result<DecodedImage, (CropError, Image)> {
    let (display_w, display_h) = image.display_size();
    if !crop.fits_within(display_w, display_h) {
        let error = CropError::RegionOutOfBounds {
            rect: *crop,
            width: display_w,
            height: display_h,
            rotation: image.rotation.degrees(),
        };
        return Err((error, image));
    }

    let (out_w, out_h) = (crop.width() as u32, crop.height() as u32);
    let planned = planned_size(spec, out_w, out_h, Rotation::Deg0);
    let needed = match output_bytes(&image, out_w, out_h, planned) {
        Some(needed) => needed,
        None => return Err((CropError::OutOfMemory { requested: usize::MAX }, image)),
    };
    if memory_budget.is_some_and(|budget| needed > budget) {
        return Err((CropError::OutOfMemory { requested: needed }, image));
    }
    if let Some((w, h)) = planned {
        if let Err(e) = DecodedImage::ensure_allocatable(w, h) {
            return Err((e.into(), image));
        }
    }

    let mut out = match DecodedImage::try_blank(out_w, out_h) {
        Ok(out) => out,
        Err(e) => return Err((e.into(), image)),
    };

    let (src_w, src_h) = image.source_size();
    let Some(to_output) = Affine::rect_to_rect(
        &crop.to_rect(),
        &Rect::from_size(out_w as f64, out_h as f64),
    ) else {
        let error = CropError::RegionOutOfBounds {
            rect: *crop,
            width: display_w,
            height: display_h,
            rotation: image.rotation.degrees(),
        };
        return Err((error, image));
    };
    let transform = display_matrix(image.rotation, src_w, src_h).then(&to_output);

    draw_transformed(&image.buffer, &mut out, &transform);
    drop(image);
    debug!(width = out_w, height = out_h, "source image released after drawing");
    Ok(out)
}

/// Source bytes plus every buffer the full path allocates, or `None` on
/// overflow.
fn output_bytes(image: &Image, out_w: u32, out_h: u32, planned: Option<(u32, u32)>) -> Option<usize> {
    let finished = match planned {
        Some((w, h)) => DecodedImage::buffer_len(w, h)?,
        None => 0,
    };
    image
        .buffer
        .byte_size()
        .checked_add(DecodedImage::buffer_len(out_w, out_h)?)?
        .checked_add(finished)
}

/// Encode `image` as JPEG into a freshly opened sink.
pub fn write_output(image: &DecodedImage, quality: u8, sink: &dyn SinkProvider) -> Result<(), CropError> {
    let mut writer = sink
        .open_sink()
        .map_err(|e| CropError::SinkWrite(e.to_string()))?;
    write_jpeg(image, quality, &mut writer).map_err(|e| CropError::SinkWrite(e.to_string()))
}
