//! The layer loading session.
//!
//! A session walks a caller-supplied list of layers one at a time. For each
//! layer it compiles the descriptor, resolves materials, fetches every
//! referenced source once, decodes the queued buffers, assigns selection
//! colors, and hands the finished layer to a [`Dispatcher`].
//!
//! # Cancellation
//!
//! The session polls its [`CancellationToken`] before each layer, before each
//! draw group's material is resolved, after the materials are done, after
//! each source fetch, after each decode request, and before each group is
//! colored. Worst-case latency is therefore one decode request or one fetch.
//! A layer interrupted by cancellation is discarded, never delivered.
//!
//! # Failures
//!
//! - Descriptor, parse, and fetch failures skip the layer.
//! - Decode failures drop the affected draw group.
//! - Missing texture assets leave the group's image empty.
//! - Running out of selection colors ends the session with an error.

use std::fmt;
use std::thread::JoinHandle;
use std::time::Duration;

use layerpack_decode::{ScratchBuffer, decode_indices, decode_vertices, vertex_count};
use web_time::Instant;

use crate::cancel::{CancellationToken, Cancelled};
use crate::colors::ColorAllocator;
use crate::descriptor::{
    ConfigSource, DecodeRequest, GroupDescriptor, JsonConfigSource, compile_layer,
};
use crate::dispatch::Dispatcher;
use crate::error::{ConfigError, Error, Result};
use crate::locator::LocatorTable;
use crate::options::LoaderOptions;
use crate::store::ResourceStore;
use crate::texture::TextureProvider;
use crate::types::{DrawGroup, LayerResult, LayerSpec, ResourceId};

/// Lifecycle of a loading session.
///
/// `Idle -> Running -> Completed | Cancelled | FailedFatal`. A report only
/// ever carries `Completed` or `Cancelled`: a session that fails returns its
/// error from [`LayersLoader::run`] or [`SessionHandle::join`] instead. Use
/// [`SessionState::of`] to map either outcome to a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not started.
    #[default]
    Idle,
    /// Loading layers.
    Running,
    /// Every layer was attempted.
    Completed,
    /// Stopped early at a cancellation checkpoint.
    Cancelled,
    /// Stopped by a fatal error such as [`Error::AllocationOverflow`].
    FailedFatal,
}

impl SessionState {
    /// The final state of a session, given what it returned.
    #[must_use]
    pub fn of(outcome: &Result<SessionReport>) -> Self {
        match outcome {
            Ok(report) => report.state,
            Err(_) => SessionState::FailedFatal,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::FailedFatal => "failed",
        })
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// How the session ended.
    pub state: SessionState,
    /// Layers handed to the dispatcher.
    pub layers_delivered: usize,
    /// Layers skipped because of non-fatal errors.
    pub layers_skipped: usize,
    /// Draw groups dropped because their buffers failed to decode.
    pub groups_dropped: usize,
    /// Resource fetches, descriptors included.
    pub fetches: usize,
    /// Decode requests run.
    pub decode_requests: usize,
    /// Scratch chunks written by the codec.
    pub chunks_decoded: u64,
}

/// Time spent in each phase of one layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerTimings {
    /// Reading, parsing, and compiling the descriptor.
    pub descriptor: Duration,
    /// Resolving materials.
    pub textures: Duration,
    /// Fetching encoded sources.
    pub fetch: Duration,
    /// Decoding buffers.
    pub decode: Duration,
    /// Validating groups and assigning colors.
    pub colors: Duration,
}

impl LayerTimings {
    /// Sum of all phases.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.descriptor + self.textures + self.fetch + self.decode + self.colors
    }
}

/// Why a layer produced no result.
enum LayerError {
    Cancelled,
    Skipped(Error),
    Fatal(Error),
}

impl From<Cancelled> for LayerError {
    fn from(_: Cancelled) -> Self {
        LayerError::Cancelled
    }
}

/// State that lives for exactly one session.
struct Session<'a> {
    token: &'a CancellationToken,
    scratch: ScratchBuffer,
    colors: ColorAllocator,
    report: SessionReport,
}

impl<'a> Session<'a> {
    fn new(token: &'a CancellationToken, scratch_len: usize) -> Self {
        Self {
            token,
            scratch: ScratchBuffer::with_len(scratch_len),
            colors: ColorAllocator::new(),
            report: SessionReport {
                state: SessionState::Running,
                ..SessionReport::default()
            },
        }
    }
}

/// A draw group whose buffers are being decoded.
struct PendingGroup<I> {
    descriptor: GroupDescriptor,
    image: Option<I>,
    indices: Option<Vec<u16>>,
    vertices: Option<Vec<i16>>,
    error: Option<Error>,
}

impl<I> PendingGroup<I> {
    fn new(descriptor: GroupDescriptor, image: Option<I>) -> Self {
        Self {
            descriptor,
            image,
            indices: None,
            vertices: None,
            error: None,
        }
    }

    fn fail(&mut self, error: Error) {
        // Keep the first failure; later ones are usually consequences.
        self.error.get_or_insert(error);
    }

    /// Check the decoded buffers against the descriptor.
    fn finish(self) -> std::result::Result<DrawGroup<I>, Error> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let invalid = |detail: String| {
            Error::Decode(layerpack_decode::DecodeError::InvalidFormat {
                context: "draw group",
                detail,
            })
        };

        let indices = self
            .indices
            .ok_or_else(|| invalid("index buffer was never decoded".to_string()))?;
        let vertices = self
            .vertices
            .ok_or_else(|| invalid("vertex buffer was never decoded".to_string()))?;

        if indices.len() != self.descriptor.total_index_count {
            return Err(invalid(format!(
                "decoded {} indices, descriptor declares {}",
                indices.len(),
                self.descriptor.total_index_count
            )));
        }

        let vertices_len = vertex_count(vertices.len());
        if let Some(&index) = indices.iter().find(|&&i| usize::from(i) >= vertices_len) {
            return Err(invalid(format!(
                "index {index} out of bounds for {vertices_len} vertices"
            )));
        }

        Ok(DrawGroup {
            material: self.descriptor.material,
            image: self.image,
            primitives: self.descriptor.primitives,
            indices,
            vertices,
            colors: Vec::new(),
            total_index_count: self.descriptor.total_index_count,
        })
    }
}

/// Loads encoded layers through pluggable collaborators.
///
/// - `S`: where descriptor, buffer, and texture bytes come from
/// - `T`: how materials become images
/// - `C`: how descriptor text becomes a field tree
/// - `L`: how buffer keys become file locators
pub struct LayersLoader<S, T, L, C = JsonConfigSource> {
    store: S,
    textures: T,
    locators: L,
    config: C,
    options: LoaderOptions,
}

impl<S, T, L> LayersLoader<S, T, L, JsonConfigSource>
where
    S: ResourceStore,
    T: TextureProvider,
    L: LocatorTable,
{
    /// Create a loader reading JSON descriptors with default options.
    #[must_use]
    pub fn new(store: S, textures: T, locators: L) -> Self {
        Self {
            store,
            textures,
            locators,
            config: JsonConfigSource,
            options: LoaderOptions::default(),
        }
    }
}

impl<S, T, L, C> LayersLoader<S, T, L, C>
where
    S: ResourceStore,
    T: TextureProvider,
    L: LocatorTable,
    C: ConfigSource,
{
    /// Replace the descriptor parser.
    #[must_use]
    pub fn with_config_source<C2: ConfigSource>(self, config: C2) -> LayersLoader<S, T, L, C2> {
        LayersLoader {
            store: self.store,
            textures: self.textures,
            locators: self.locators,
            config,
            options: self.options,
        }
    }

    /// Replace the loader options.
    #[must_use]
    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// The loader options.
    #[must_use]
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Run a session on the current thread.
    ///
    /// Layers are loaded in the given order and delivered through
    /// `dispatcher` as they finish; the last layer in `layers` is flagged as
    /// final. Color indices restart at 1 for every session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationOverflow`] if the session runs out of
    /// selection colors. Per-layer problems are logged, never returned.
    pub fn run<D>(
        &self,
        layers: &[LayerSpec],
        token: &CancellationToken,
        dispatcher: &D,
    ) -> Result<SessionReport>
    where
        D: Dispatcher<T::Image> + ?Sized,
    {
        let started = Instant::now();
        let mut session = Session::new(token, self.options.scratch_len);

        for (position, layer) in layers.iter().enumerate() {
            if token.is_cancelled() {
                session.report.state = SessionState::Cancelled;
                break;
            }

            tracing::info!(layer_id = layer.layer_id, source = %layer.source, "loading layer");
            let layer_started = Instant::now();

            match self.load_layer(layer, &mut session) {
                Ok(groups) => {
                    if token.is_cancelled() {
                        session.report.state = SessionState::Cancelled;
                        break;
                    }
                    let is_final_layer = position + 1 == layers.len();
                    let result = LayerResult::new(
                        layer.layer_id,
                        groups,
                        session.colors.snapshot(),
                        is_final_layer,
                    );
                    tracing::info!(
                        layer_id = layer.layer_id,
                        groups = result.draw_groups().len(),
                        max_color_index = result.max_color_index(),
                        "layer took {:.3} s",
                        layer_started.elapsed().as_secs_f32()
                    );
                    dispatcher.dispatch(result);
                    session.report.layers_delivered += 1;
                }
                Err(LayerError::Skipped(error)) => {
                    tracing::warn!(layer_id = layer.layer_id, source = %layer.source, "skipping layer: {error}");
                    session.report.layers_skipped += 1;
                }
                Err(LayerError::Cancelled) => {
                    session.report.state = SessionState::Cancelled;
                    break;
                }
                Err(LayerError::Fatal(error)) => {
                    tracing::error!(layer_id = layer.layer_id, "loading session failed: {error}");
                    return Err(error);
                }
            }
        }

        if session.report.state == SessionState::Running {
            session.report.state = SessionState::Completed;
        }
        session.report.chunks_decoded = session.scratch.chunks_decoded();

        tracing::info!(
            cancelled = session.report.state == SessionState::Cancelled,
            delivered = session.report.layers_delivered,
            skipped = session.report.layers_skipped,
            "all layers took {:.3} s",
            started.elapsed().as_secs_f32()
        );

        // The scratch buffer is released with the session.
        Ok(session.report)
    }

    /// Run a session on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Worker`] if the thread cannot be started.
    pub fn spawn<D>(self, layers: Vec<LayerSpec>, dispatcher: D) -> Result<SessionHandle>
    where
        Self: Send + 'static,
        D: Dispatcher<T::Image> + 'static,
    {
        let token = CancellationToken::new();
        let worker_token = token.clone();

        let thread = std::thread::Builder::new()
            .name("layerpack-loader".to_string())
            .spawn(move || self.run(&layers, &worker_token, &dispatcher))
            .map_err(|e| Error::Worker {
                message: e.to_string(),
            })?;

        Ok(SessionHandle { token, thread })
    }

    /// Load one layer, returning its finished draw groups.
    fn load_layer(
        &self,
        layer: &LayerSpec,
        session: &mut Session<'_>,
    ) -> std::result::Result<Vec<DrawGroup<T::Image>>, LayerError> {
        let mut timings = LayerTimings::default();

        // Descriptor.
        let phase = Instant::now();
        let raw = self.fetch(layer.source, session).map_err(LayerError::Skipped)?;
        let text = String::from_utf8(raw).map_err(|e| {
            LayerError::Skipped(
                ConfigError::MalformedInput {
                    detail: e.to_string(),
                }
                .into(),
            )
        })?;
        let tree = self
            .config
            .parse_layer(&text)
            .map_err(|e| LayerError::Skipped(e.into()))?;
        let compiled =
            compile_layer(&tree, &self.locators).map_err(|e| LayerError::Skipped(e.into()))?;
        timings.descriptor = phase.elapsed();
        tracing::debug!(
            layer_id = layer.layer_id,
            groups = compiled.groups.len(),
            sources = compiled.plan.len(),
            requests = compiled.plan.request_count(),
            "compiled layer descriptor"
        );

        // Materials.
        let phase = Instant::now();
        let mut pending = Vec::with_capacity(compiled.groups.len());
        for (position, descriptor) in compiled.groups.into_iter().enumerate() {
            session.token.checkpoint()?;
            let image = match self.textures.resolve(&descriptor.material) {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!(layer_id = layer.layer_id, group = position, "{e}");
                    None
                }
            };
            pending.push(PendingGroup::new(descriptor, image));
        }
        timings.textures = phase.elapsed();
        session.token.checkpoint()?;

        // Sources and buffers.
        for (source, requests) in compiled.plan.into_batches() {
            let phase = Instant::now();
            let bytes = self.fetch(source, session).map_err(LayerError::Skipped)?;
            timings.fetch += phase.elapsed();
            session.token.checkpoint()?;

            let phase = Instant::now();
            match self.options.word_encoding.decode(&bytes) {
                Ok(words) => decode_batch(layer, &requests, &words, &mut pending, session)?,
                Err(e) => {
                    tracing::warn!(layer_id = layer.layer_id, source = %source, "{e}");
                    for request in &requests {
                        if let Some(group) = pending.get_mut(request.group()) {
                            group.fail(e.clone().into());
                        }
                    }
                }
            }
            timings.decode += phase.elapsed();
        }

        // Validation and selection colors.
        let phase = Instant::now();
        let mut groups = Vec::with_capacity(pending.len());
        for (position, group) in pending.into_iter().enumerate() {
            session.token.checkpoint()?;
            match group.finish() {
                Ok(mut group) => {
                    session
                        .colors
                        .assign(&mut group)
                        .map_err(LayerError::Fatal)?;
                    groups.push(group);
                }
                Err(e) => {
                    tracing::warn!(layer_id = layer.layer_id, group = position, "dropping draw group: {e}");
                    session.report.groups_dropped += 1;
                }
            }
        }
        timings.colors = phase.elapsed();

        tracing::info!(
            layer_id = layer.layer_id,
            "descriptor: {:.3}, texture: {:.3}, res read: {:.3}, res decode: {:.3}, colorbuf: {:.3} (total {:.3} s)",
            timings.descriptor.as_secs_f32(),
            timings.textures.as_secs_f32(),
            timings.fetch.as_secs_f32(),
            timings.decode.as_secs_f32(),
            timings.colors.as_secs_f32(),
            timings.total().as_secs_f32(),
        );

        Ok(groups)
    }

    fn fetch(&self, source: ResourceId, session: &mut Session<'_>) -> Result<Vec<u8>> {
        tracing::debug!(source = %source, "fetching");
        session.report.fetches += 1;
        Ok(self.store.fetch_bytes(source)?)
    }
}

/// Run every decode request queued against one source.
///
/// The token is polled after each request, so cancellation lands at most one
/// request late.
fn decode_batch<I>(
    layer: &LayerSpec,
    requests: &[DecodeRequest],
    words: &[u16],
    pending: &mut [PendingGroup<I>],
    session: &mut Session<'_>,
) -> std::result::Result<(), LayerError> {
    for request in requests {
        run_request(layer, request, words, pending, session);
        session.token.checkpoint()?;
    }
    Ok(())
}

/// Decode one buffer into its pending group.
fn run_request<I>(
    layer: &LayerSpec,
    request: &DecodeRequest,
    words: &[u16],
    pending: &mut [PendingGroup<I>],
    session: &mut Session<'_>,
) {
    session.report.decode_requests += 1;

    let Some(group) = pending.get_mut(request.group()) else {
        return;
    };
    let locator = request.locator();
    let scratch = &mut session.scratch;

    let decoded = match request {
        DecodeRequest::Indices { .. } => {
            decode_indices(words, locator.offset, locator.length, scratch)
                .map(|indices| group.indices = Some(indices))
        }
        DecodeRequest::Attributes { .. } => {
            decode_vertices(words, locator.offset, locator.length, scratch)
                .map(|vertices| group.vertices = Some(vertices))
        }
    };

    if let Err(e) = decoded {
        tracing::warn!(
            layer_id = layer.layer_id,
            source = %locator.source,
            group = request.group(),
            kind = request.kind(),
            "{e}"
        );
        group.fail(e.into());
    }
}

/// Handle to a session running on a worker thread.
#[derive(Debug)]
pub struct SessionHandle {
    token: CancellationToken,
    thread: JoinHandle<Result<SessionReport>>,
}

impl SessionHandle {
    /// Ask the session to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A clone of the session's cancellation token.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the worker has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the session to end.
    ///
    /// # Errors
    ///
    /// Returns the session's fatal error, or [`Error::Worker`] if the worker
    /// panicked.
    pub fn join(self) -> Result<SessionReport> {
        self.thread.join().map_err(|_| Error::Worker {
            message: "loader thread panicked".to_string(),
        })?
    }
}
