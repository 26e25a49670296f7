//! The host-facing crop session.
//!
//! A [`CropSession`] owns the decoded image, the view, the crop regions and
//! the pointer controller. Pointer callbacks, [`CropSession::commit`],
//! [`CropSession::pump`] and [`CropSession::tick`] are all called from the
//! host's UI thread; only the crop job itself runs on the dispatcher.
//!
//! # Lifecycle
//!
//! ```text
//! Editing --commit--> Committing --pump: ok--------------> Finished
//!    ^                    |---------pump: recoverable---> Editing
//!    |                    '---------pump: SourceRead----> Failed
//!    '--- cancel() from any state ------------------------> Cancelled
//! ```
//!
//! A recoverable failure only returns to editing when there is still
//! something to crop from: the in-memory image, or a source with a region
//! decoder. Otherwise the session fails.
//!
//! Job outcomes travel back through an mpsc channel and take effect only in
//! `pump()`. After `cancel()` (or once the session is dropped) they are
//! discarded. A panicking job is reported as [`CropError::JobPanicked`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{OutputSpec, SessionConfig};
use crate::decode::{decode_image, read_stream, DecodeError, Image};
use crate::dispatch::InlineDispatcher;
use crate::error::CropError;
use crate::geometry::{IntRect, Point, Rect};
use crate::host::{Dispatcher, RegionDecoder, RegionProvider, SinkProvider, SourceProvider};
use crate::interaction::{ensure_visible, InteractionController};
use crate::pipeline::{CommitOutcome, CropJob, CropOutput, CropSource};
use crate::region::{AspectRatio, CropRegion, RegionSet};
use crate::transform::Rotation;
use crate::view::ViewTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Pointer events edit the region.
    Editing,
    /// A crop job is in flight; pointer events are ignored.
    Committing,
    /// A result is available.
    Finished,
    /// The source became unreadable, or nothing is left to crop from.
    Failed,
    Cancelled,
}

/// What [`CropSession::commit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Dispatched,
    /// A job from an earlier commit has not been pumped yet.
    AlreadyInFlight,
    /// No region, or no pixels left to crop from.
    NothingToCommit,
    /// The session is finished, failed or cancelled.
    Closed,
}

/// Reported by [`CropSession::pump`].
#[derive(Debug)]
pub enum SessionEvent {
    /// The crop succeeded; the result is in [`CropSession::output`].
    Completed {
        sink: Option<Result<(), CropError>>,
    },
    Failed(CropError),
}

/// Collects collaborators for a [`CropSession`].
pub struct CropSessionBuilder {
    config: SessionConfig,
    image: Option<Image>,
    source: Option<Arc<dyn SourceProvider>>,
    region_decoder: Option<Arc<dyn RegionDecoder>>,
    sink: Option<Arc<dyn SinkProvider>>,
    region_provider: Option<Box<dyn RegionProvider>>,
    dispatcher: Option<Box<dyn Dispatcher>>,
    viewport: Option<(f64, f64)>,
}

impl CropSessionBuilder {
    /// Start from an already decoded image. A rotation set in the config
    /// overrides the image's own.
    pub fn image(mut self, image: Image) -> Self {
        self.image = Some(image);
        self
    }

    /// Re-openable source. Decoded on `build()` unless an image is given;
    /// required for partial-region decoding.
    pub fn source(mut self, source: Arc<dyn SourceProvider>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn region_decoder(mut self, decoder: Arc<dyn RegionDecoder>) -> Self {
        self.region_decoder = Some(decoder);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn SinkProvider>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn region_provider(mut self, provider: Box<dyn RegionProvider>) -> Self {
        self.region_provider = Some(provider);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Box<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Viewport size in screen pixels. Defaults to the display size of the
    /// image, i.e. one screen pixel per image pixel.
    pub fn viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Some((width, height));
        self
    }

    pub fn build(self) -> Result<CropSession, CropError> {
        self.config.validate()?;

        let image = match (self.image, &self.source) {
            (Some(mut image), _) => {
                if let Some(rotation) = self.config.rotation {
                    image.rotation = rotation;
                }
                image
            }
            (None, Some(source)) => {
                let bytes = source
                    .open()
                    .map_err(|e| CropError::SourceRead(DecodeError::IoError(e)))
                    .and_then(|stream| read_stream(stream).map_err(CropError::SourceRead))?;
                decode_image(&bytes, self.config.rotation).map_err(CropError::SourceRead)?
            }
            (None, None) => {
                return Err(CropError::InvalidConfig(
                    "an image or a source is required".to_string(),
                ))
            }
        };

        let (width, height) = image.display_size();
        if width == 0 || height == 0 {
            return Err(CropError::SourceRead(DecodeError::InvalidFormat));
        }

        let (vw, vh) = self.viewport.unwrap_or((width as f64, height as f64));
        if !(vw.is_finite() && vh.is_finite() && vw > 0.0 && vh > 0.0) {
            return Err(CropError::InvalidConfig(format!(
                "viewport must be positive, got {vw}x{vh}"
            )));
        }
        let view = ViewTransform::new(width, height, vw, vh);

        let aspect = self
            .config
            .aspect()
            .and_then(|(x, y)| AspectRatio::new(x, y));
        let min_size = self.config.min_crop_size;
        let candidate = self
            .region_provider
            .as_ref()
            .and_then(|p| p.candidates(&image).into_iter().next());
        let mut region = match candidate {
            Some(rect) => CropRegion::from_candidate(rect, width, height, aspect, min_size),
            None => CropRegion::default_for(width, height, aspect, min_size),
        };
        region.set_focused(true);

        let mut regions = RegionSet::new();
        regions.push(region);

        let rotation = image.rotation;
        info!(
            width,
            height,
            rotation = rotation.degrees(),
            partial = self.region_decoder.is_some() && self.source.is_some(),
            "crop session opened"
        );

        let (tx, rx) = mpsc::channel();
        Ok(CropSession {
            config: self.config,
            image: Some(image),
            display_size: (width, height),
            rotation,
            source: self.source,
            region_decoder: self.region_decoder,
            sink: self.sink,
            dispatcher: self.dispatcher.unwrap_or_else(default_dispatcher),
            view,
            regions,
            controller: InteractionController::new(),
            state: SessionState::Editing,
            completions_tx: tx,
            completions_rx: rx,
            output: None,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(feature = "threads")]
fn default_dispatcher() -> Box<dyn Dispatcher> {
    Box::new(crate::dispatch::RayonDispatcher)
}

#[cfg(not(feature = "threads"))]
fn default_dispatcher() -> Box<dyn Dispatcher> {
    Box::new(InlineDispatcher)
}

pub struct CropSession {
    config: SessionConfig,
    /// `None` once released to the pipeline.
    image: Option<Image>,
    display_size: (u32, u32),
    rotation: Rotation,
    source: Option<Arc<dyn SourceProvider>>,
    region_decoder: Option<Arc<dyn RegionDecoder>>,
    sink: Option<Arc<dyn SinkProvider>>,
    dispatcher: Box<dyn Dispatcher>,
    view: ViewTransform,
    regions: RegionSet,
    controller: InteractionController,
    state: SessionState,
    completions_tx: Sender<CommitOutcome>,
    completions_rx: Receiver<CommitOutcome>,
    output: Option<CropOutput>,
}

impl CropSession {
    pub fn builder(config: SessionConfig) -> CropSessionBuilder {
        CropSessionBuilder {
            config,
            image: None,
            source: None,
            region_decoder: None,
            sink: None,
            region_provider: None,
            dispatcher: None,
            viewport: None,
        }
    }

    /// Open a session on a source stream with full-decode cropping.
    pub fn new(
        source: Arc<dyn SourceProvider>,
        config: SessionConfig,
        viewport: (f64, f64),
        dispatcher: Box<dyn Dispatcher>,
    ) -> Result<Self, CropError> {
        Self::builder(config)
            .source(source)
            .viewport(viewport.0, viewport.1)
            .dispatcher(dispatcher)
            .build()
    }

    /// Open a session on an in-memory image, running jobs inline.
    pub fn from_image(image: Image, config: SessionConfig) -> Result<Self, CropError> {
        Self::builder(config)
            .image(image)
            .dispatcher(Box::new(InlineDispatcher))
            .build()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    /// The in-memory image, until it is handed to the pipeline.
    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    /// Rotation-corrected image size.
    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Focused region in image pixels.
    pub fn crop_rect(&self) -> Option<IntRect> {
        self.regions.focused().map(CropRegion::crop_rect)
    }

    /// Focused region on screen.
    pub fn draw_rect(&self) -> Option<Rect> {
        self.regions.focused().map(|r| r.draw_rect(&self.view))
    }

    pub fn output(&self) -> Option<&CropOutput> {
        self.output.as_ref()
    }

    pub fn take_output(&mut self) -> Option<CropOutput> {
        self.output.take()
    }

    /// Returns true when a drag started.
    pub fn on_pointer_down(&mut self, x: f64, y: f64) -> bool {
        if self.state != SessionState::Editing {
            return false;
        }
        self.controller.pointer_down(
            Point::new(x, y),
            &mut self.regions,
            &mut self.view,
            self.config.hit_tolerance,
        )
    }

    /// Returns true when the screen needs a redraw.
    pub fn on_pointer_move(&mut self, x: f64, y: f64) -> bool {
        if self.state != SessionState::Editing {
            return false;
        }
        self.controller
            .pointer_move(Point::new(x, y), &mut self.regions, &mut self.view)
    }

    pub fn on_pointer_up(&mut self, now_ms: f64) -> bool {
        if self.state != SessionState::Editing {
            return false;
        }
        self.controller
            .pointer_up(&mut self.regions, &mut self.view, now_ms)
    }

    /// Advance the view animation. Returns true when the view changed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if !self.view.tick(now_ms) {
            return false;
        }
        if !self.controller.is_dragging() {
            if let Some(region) = self.regions.focused() {
                ensure_visible(region, &mut self.view);
            }
            if !self.view.is_animating() {
                self.view.center(true, true);
            }
        }
        true
    }

    /// Replace the output policy for later commits.
    pub fn set_output(&mut self, output: OutputSpec) -> Result<(), CropError> {
        output.validate()?;
        debug!(?output, "output spec changed");
        self.config.output = output;
        Ok(())
    }

    /// Host viewport resized.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            warn!(width, height, "ignoring invalid viewport");
            return;
        }
        self.view.set_viewport(width, height);
        self.view.center(true, true);
    }

    /// Hand the focused region to the pipeline.
    pub fn commit(&mut self) -> CommitStatus {
        match self.state {
            SessionState::Editing => {}
            SessionState::Committing => {
                debug!("commit ignored, crop already in flight");
                return CommitStatus::AlreadyInFlight;
            }
            SessionState::Finished | SessionState::Failed | SessionState::Cancelled => {
                return CommitStatus::Closed;
            }
        }

        let Some(crop) = self.crop_rect().filter(|r| !r.is_empty()) else {
            return CommitStatus::NothingToCommit;
        };

        let source = match (&self.source, &self.region_decoder) {
            (Some(source), Some(decoder)) => {
                if self.image.take().is_some() {
                    debug!("in-memory image released before region decode");
                }
                CropSource::Region {
                    source: Arc::clone(source),
                    decoder: Arc::clone(decoder),
                }
            }
            _ => match self.image.take() {
                Some(image) => CropSource::Full(image),
                None => return CommitStatus::NothingToCommit,
            },
        };

        self.controller.reset(&mut self.regions);
        self.state = SessionState::Committing;
        info!(%crop, strategy = ?source.strategy(), "commit dispatched");

        let job = CropJob {
            crop,
            rotation: self.rotation,
            output: self.config.output.clone(),
            memory_budget: self.config.memory_budget,
            source,
            sink: self.sink.clone(),
        };
        let tx = self.completions_tx.clone();
        self.dispatcher.dispatch(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run())).unwrap_or_else(|payload| {
                CommitOutcome::Failed {
                    error: CropError::JobPanicked(panic_message(payload.as_ref())),
                    recovered: None,
                }
            });
            // The receiver is gone once the session is dropped
            let _ = tx.send(outcome);
        }));
        CommitStatus::Dispatched
    }

    /// Whether a later commit would have pixels to work with.
    fn can_recommit(&self) -> bool {
        self.image.is_some() || (self.source.is_some() && self.region_decoder.is_some())
    }

    /// Apply finished jobs. Call from the UI thread.
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(outcome) = self.completions_rx.try_recv() {
            if self.state != SessionState::Committing {
                debug!(state = ?self.state, "discarding crop outcome");
                continue;
            }
            events.push(self.apply(outcome));
        }
        events
    }

    fn apply(&mut self, outcome: CommitOutcome) -> SessionEvent {
        match outcome {
            CommitOutcome::Completed { output, sink } => {
                info!(
                    width = output.image.width,
                    height = output.image.height,
                    rotation = output.rotation.degrees(),
                    "crop finished"
                );
                self.output = Some(output);
                self.state = SessionState::Finished;
                SessionEvent::Completed { sink }
            }
            CommitOutcome::Failed { error, recovered } => {
                if error.is_fatal() {
                    warn!(%error, "crop session failed");
                    self.image = None;
                    self.state = SessionState::Failed;
                } else {
                    if recovered.is_some() {
                        self.image = recovered;
                    }
                    if self.can_recommit() {
                        warn!(%error, "crop failed, back to editing");
                        self.state = SessionState::Editing;
                    } else {
                        warn!(%error, "crop failed and the image is gone");
                        self.state = SessionState::Failed;
                    }
                }
                SessionEvent::Failed(error)
            }
        }
    }

    /// Stop the session. Pending outcomes are dropped.
    pub fn cancel(&mut self) {
        if self.state == SessionState::Cancelled {
            return;
        }
        info!(state = ?self.state, "crop session cancelled");
        self.controller.reset(&mut self.regions);
        self.view.cancel_animation();
        self.image = None;
        self.state = SessionState::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::test_support::{gradient, jpeg_with_orientation, png_bytes};
    use crate::decode::ImageRegionDecoder;
    use crate::host::{BytesSource, FixedRegions, Job, SharedBufferSink};
    use std::cell::RefCell;
    use std::io::{self, Read};
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Queues jobs until the test runs them.
    #[derive(Clone, Default)]
    struct ManualDispatcher(Rc<RefCell<Vec<Job>>>);

    impl ManualDispatcher {
        fn pending(&self) -> usize {
            self.0.borrow().len()
        }

        fn run_all(&self) {
            let jobs: Vec<Job> = self.0.borrow_mut().drain(..).collect();
            for job in jobs {
                job();
            }
        }
    }

    impl Dispatcher for ManualDispatcher {
        fn dispatch(&self, job: Job) {
            self.0.borrow_mut().push(job);
        }
    }

    /// Opens successfully a limited number of times.
    struct FlakySource {
        bytes: Vec<u8>,
        remaining: AtomicUsize,
    }

    impl SourceProvider for FlakySource {
        fn open(&self) -> io::Result<Box<dyn Read + Send>> {
            let left = self.remaining.load(Ordering::SeqCst);
            if left == 0 {
                return Err(io::Error::new(io::ErrorKind::NotFound, "source went away"));
            }
            self.remaining.store(left - 1, Ordering::SeqCst);
            Ok(Box::new(io::Cursor::new(self.bytes.clone())))
        }
    }

    /// Panics as soon as the job tries to write.
    struct ExplodingSink;

    impl SinkProvider for ExplodingSink {
        fn open_sink(&self) -> io::Result<Box<dyn io::Write + Send>> {
            panic!("sink exploded")
        }
    }

    fn square() -> SessionConfig {
        SessionConfig {
            aspect_x: 1,
            aspect_y: 1,
            ..Default::default()
        }
    }

    fn session_with(config: SessionConfig, dispatcher: Box<dyn Dispatcher>) -> CropSession {
        CropSession::builder(config)
            .image(Image::new(gradient(200, 100), Rotation::Deg0))
            .dispatcher(dispatcher)
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_region_from_image() {
        let session = CropSession::from_image(Image::new(gradient(100, 50), Rotation::Deg0), square()).unwrap();

        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.crop_rect(), Some(IntRect::new(30, 5, 70, 45)));
        assert!(session.regions().focused().unwrap().is_focused());
    }

    #[test]
    fn test_rotation_read_from_exif() {
        let bytes = jpeg_with_orientation(&gradient(40, 20), 6);
        let session = CropSession::new(
            Arc::new(BytesSource::new(bytes)),
            SessionConfig::default(),
            (100.0, 100.0),
            Box::new(InlineDispatcher),
        )
        .unwrap();

        assert_eq!(session.rotation(), Rotation::Deg90);
        assert_eq!(session.display_size(), (20, 40));
    }

    #[test]
    fn test_config_rotation_overrides() {
        let config = SessionConfig {
            rotation: Some(Rotation::Deg270),
            ..Default::default()
        };
        let session = CropSession::from_image(Image::new(gradient(40, 20), Rotation::Deg0), config).unwrap();
        assert_eq!(session.rotation(), Rotation::Deg270);
        assert_eq!(session.display_size(), (20, 40));
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let result = CropSession::new(
            Arc::new(BytesSource::new(vec![1u8, 2, 3])),
            SessionConfig::default(),
            (100.0, 100.0),
            Box::new(InlineDispatcher),
        );
        match result {
            Err(e) => assert!(e.is_fatal()),
            Ok(_) => panic!("garbage opened"),
        }
    }

    #[test]
    fn test_build_requires_image_or_source() {
        let result = CropSession::builder(SessionConfig::default()).build();
        assert!(matches!(result, Err(CropError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_rejects_bad_viewport_and_config() {
        let result = CropSession::builder(SessionConfig::default())
            .image(Image::new(gradient(10, 10), Rotation::Deg0))
            .viewport(0.0, 100.0)
            .build();
        assert!(matches!(result, Err(CropError::InvalidConfig(_))));

        let config = SessionConfig {
            min_crop_size: 0.0,
            ..Default::default()
        };
        let result = CropSession::from_image(Image::new(gradient(10, 10), Rotation::Deg0), config);
        assert!(matches!(result, Err(CropError::InvalidConfig(_))));
    }

    #[test]
    fn test_region_provider_candidate() {
        let session = CropSession::builder(SessionConfig::default())
            .image(Image::new(gradient(100, 50), Rotation::Deg0))
            .region_provider(Box::new(FixedRegions(vec![
                Rect::new(10.0, 10.0, 60.0, 40.0),
                Rect::new(0.0, 0.0, 5.0, 5.0),
            ])))
            .build()
            .unwrap();

        assert_eq!(session.crop_rect(), Some(IntRect::new(10, 10, 60, 40)));
    }

    #[test]
    fn test_drag_then_commit_full_path() {
        let mut session = session_with(square(), Box::new(InlineDispatcher));
        assert_eq!(session.crop_rect(), Some(IntRect::new(60, 10, 140, 90)));

        assert!(session.on_pointer_down(140.0, 50.0));
        assert!(session.on_pointer_move(150.0, 50.0));
        assert!(session.on_pointer_up(0.0));
        assert_eq!(session.crop_rect(), Some(IntRect::new(60, 10, 150, 100)));

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        assert!(session.image().is_none());

        let events = session.pump();
        assert!(matches!(events.as_slice(), [SessionEvent::Completed { sink: None }]));
        assert_eq!(session.state(), SessionState::Finished);

        let output = session.take_output().unwrap();
        assert_eq!((output.image.width, output.image.height), (90, 90));
        assert_eq!(output.rotation, Rotation::Deg0);
        assert_eq!(session.commit(), CommitStatus::Closed);
    }

    #[test]
    fn test_double_commit_dispatches_once() {
        let dispatcher = ManualDispatcher::default();
        let mut session = session_with(square(), Box::new(dispatcher.clone()));

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        assert_eq!(session.commit(), CommitStatus::AlreadyInFlight);
        assert_eq!(dispatcher.pending(), 1);

        // Editing is frozen while the job is out
        assert!(!session.on_pointer_down(140.0, 50.0));

        dispatcher.run_all();
        assert_eq!(session.pump().len(), 1);
        assert_eq!(session.state(), SessionState::Finished);
    }

    #[test]
    fn test_cancel_discards_outcome() {
        let dispatcher = ManualDispatcher::default();
        let mut session = session_with(square(), Box::new(dispatcher.clone()));

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        session.cancel();
        dispatcher.run_all();

        assert!(session.pump().is_empty());
        assert_eq!(session.state(), SessionState::Cancelled);
        assert!(session.output().is_none());
        assert_eq!(session.commit(), CommitStatus::Closed);
    }

    #[test]
    fn test_out_of_memory_allows_retry() {
        let config = SessionConfig {
            memory_budget: Some(1),
            ..square()
        };
        let mut session = session_with(config, Box::new(InlineDispatcher));

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        let events = session.pump();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Failed(CropError::OutOfMemory { .. })]
        ));
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.image().is_some());

        // Guard released, the image is back, editing works again
        assert!(session.on_pointer_down(100.0, 50.0));
        session.on_pointer_up(0.0);
        assert_eq!(session.commit(), CommitStatus::Dispatched);
    }

    #[test]
    fn test_partial_path_source_failure_is_fatal() {
        let bytes = png_bytes(&gradient(60, 40));
        let source = Arc::new(FlakySource {
            bytes,
            remaining: AtomicUsize::new(1),
        });
        let mut session = CropSession::builder(SessionConfig::default())
            .source(source)
            .region_decoder(Arc::new(ImageRegionDecoder))
            .dispatcher(Box::new(InlineDispatcher))
            .build()
            .unwrap();

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        assert!(session.image().is_none());

        let events = session.pump();
        match events.as_slice() {
            [SessionEvent::Failed(error)] => assert!(error.is_fatal()),
            other => panic!("unexpected events: {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.commit(), CommitStatus::Closed);
    }

    #[test]
    fn test_partial_path_carries_rotation() {
        let bytes = jpeg_with_orientation(&gradient(40, 20), 6);
        let sink = SharedBufferSink::new();
        let config = SessionConfig {
            output: OutputSpec {
                quality: 80,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut session = CropSession::builder(config)
            .source(Arc::new(BytesSource::new(bytes)))
            .region_decoder(Arc::new(ImageRegionDecoder))
            .sink(Arc::new(sink.clone()))
            .dispatcher(Box::new(InlineDispatcher))
            .build()
            .unwrap();

        // Display 20x40: default region is 16x16 at (2, 12)
        assert_eq!(session.crop_rect(), Some(IntRect::new(2, 12, 18, 28)));
        assert_eq!(session.commit(), CommitStatus::Dispatched);

        let events = session.pump();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Completed { sink: Some(Ok(())) }]
        ));
        let output = session.output().unwrap();
        assert_eq!(output.rotation, Rotation::Deg90);
        assert_eq!((output.image.width, output.image.height), (16, 16));
        assert!(!sink.contents().is_empty());
    }

    #[test]
    fn test_release_zoom_settles_on_tick() {
        let mut session = CropSession::builder(SessionConfig::default())
            .image(Image::new(gradient(200, 200), Rotation::Deg0))
            .dispatcher(Box::new(InlineDispatcher))
            .build()
            .unwrap();
        assert_eq!(session.crop_rect(), Some(IntRect::new(20, 20, 180, 180)));

        // Shrink through the top-left corner to 60x60
        assert!(session.on_pointer_down(20.0, 20.0));
        session.on_pointer_move(120.0, 120.0);
        session.on_pointer_up(1000.0);
        assert_eq!(session.crop_rect(), Some(IntRect::new(120, 120, 180, 180)));
        assert!(session.view().is_animating());

        assert!(session.tick(1300.0));
        assert!(!session.view().is_animating());
        assert!((session.view().scale() - 2.0).abs() < 1e-6);

        let r = session.draw_rect().unwrap();
        assert!(r.left >= -1e-6 && r.top >= -1e-6);
        assert!(r.right <= 200.0 + 1e-6 && r.bottom <= 200.0 + 1e-6);
        assert!(!session.tick(1400.0));
    }

    #[test]
    fn test_set_viewport_refits() {
        let mut session = session_with(square(), Box::new(InlineDispatcher));
        session.set_viewport(400.0, 200.0);

        let r = session.draw_rect().unwrap();
        // Base scale doubles: (60, 10)-(140, 90) lands at (120, 20)-(280, 180)
        assert!((r.left - 120.0).abs() < 1e-6);
        assert!((r.bottom - 180.0).abs() < 1e-6);

        session.set_viewport(f64::NAN, 10.0);
        assert_eq!(session.view().viewport(), (400.0, 200.0));
    }

    #[test]
    fn test_unallocatable_output_keeps_image_for_retry() {
        let config = SessionConfig {
            output: OutputSpec {
                width: Some(i32::MAX as u32),
                height: Some(i32::MAX as u32),
                ..Default::default()
            },
            ..square()
        };
        let mut session = session_with(config, Box::new(InlineDispatcher));

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        let events = session.pump();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Failed(CropError::OutOfMemory { .. })]
        ));
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.image().is_some());

        session
            .set_output(OutputSpec {
                width: Some(32),
                height: Some(32),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(session.commit(), CommitStatus::Dispatched);
        session.pump();
        assert_eq!(session.state(), SessionState::Finished);
        let output = session.output().unwrap();
        assert_eq!((output.image.width, output.image.height), (32, 32));
    }

    #[test]
    fn test_set_output_validates() {
        let mut session = session_with(square(), Box::new(InlineDispatcher));
        let result = session.set_output(OutputSpec {
            width: Some(u32::MAX),
            height: Some(u32::MAX),
            ..Default::default()
        });
        assert!(matches!(result, Err(CropError::InvalidConfig(_))));
        assert_eq!(session.config().output, OutputSpec::default());
    }

    #[test]
    fn test_failure_after_image_consumed_closes_session() {
        let dispatcher = ManualDispatcher::default();
        let mut session = session_with(square(), Box::new(dispatcher.clone()));

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        assert!(session.image().is_none());

        // The job dropped the image and then failed without handing it back
        dispatcher.0.borrow_mut().clear();
        session
            .completions_tx
            .send(CommitOutcome::Failed {
                error: CropError::OutOfMemory { requested: 1 << 20 },
                recovered: None,
            })
            .unwrap();

        let events = session.pump();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Failed(CropError::OutOfMemory { .. })]
        ));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.commit(), CommitStatus::Closed);
    }

    #[test]
    fn test_panicking_job_is_reported() {
        let mut session = CropSession::builder(square())
            .image(Image::new(gradient(200, 100), Rotation::Deg0))
            .sink(Arc::new(ExplodingSink))
            .dispatcher(Box::new(InlineDispatcher))
            .build()
            .unwrap();

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        let events = session.pump();
        match events.as_slice() {
            [SessionEvent::Failed(CropError::JobPanicked(message))] => {
                assert_eq!(message, "sink exploded")
            }
            other => panic!("unexpected events: {other:?}"),
        }
        // The image went down with the job
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.commit(), CommitStatus::Closed);
    }

    #[test]
    fn test_panicking_job_on_partial_path_allows_retry() {
        let mut session = CropSession::builder(square())
            .source(Arc::new(BytesSource::new(png_bytes(&gradient(60, 40)))))
            .region_decoder(Arc::new(ImageRegionDecoder))
            .sink(Arc::new(ExplodingSink))
            .dispatcher(Box::new(InlineDispatcher))
            .build()
            .unwrap();

        assert_eq!(session.commit(), CommitStatus::Dispatched);
        let events = session.pump();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Failed(CropError::JobPanicked(_))]
        ));
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.on_pointer_down(30.0, 20.0));
        session.on_pointer_up(0.0);
        assert_eq!(session.commit(), CommitStatus::Dispatched);
    }
}
