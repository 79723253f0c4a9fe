use std::{
    collections::{BTreeMap, HashMap, HashSet},
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, trace, warn};

use super::{error::RenderError, store::ImageStore, Renderer, Size};

/// Identifies whoever asked for a sprite. Each sprite waits for at most one
/// image at a time.
pub type SpriteId = u64;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Render worker threads. With zero, sprites are rendered on the calling
    /// thread as soon as they are requested.
    pub worker_threads: usize,
    /// Put between an element key and its frame number
    pub frame_separator: String,
    /// Number of the first frame of an animated element
    pub frame_base_index: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            frame_separator: "_".to_string(),
            frame_base_index: 0,
        }
    }
}

/// Outcome of a sprite request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStatus<I> {
    /// Served from one of the caches, or rendered synchronously
    Ready(I),
    /// A render job will deliver the image through `poll` or `wait`
    Pending,
    /// Nothing to draw: the size is empty or the element cannot be rendered
    Empty,
}

/// A finished render handed back to a waiting sprite. `image` is `None` if
/// rendering failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery<I> {
    pub sprite: SpriteId,
    pub cache_key: String,
    pub image: Option<I>,
}

struct Job {
    cache_key: String,
    element_key: String,
    size: Size,
}

struct Finished<I> {
    cache_key: String,
    image: Option<I>,
}

/// Two-tier sprite cache backed by a render worker pool.
///
/// Requests and deliveries happen on the thread owning the cache. Workers
/// only render; every cache update and every delivery happens in `poll` or
/// `wait`, so waiting sprites are always served in one place.
pub struct RenderCache<R: Renderer> {
    renderer: Arc<R>,
    store: Arc<dyn ImageStore<R::Image>>,
    config: RenderConfig,
    memory: HashMap<String, R::Image>,
    pending: BTreeMap<SpriteId, String>,
    in_flight: HashSet<String>,
    jobs: Option<Sender<Job>>,
    finished: Receiver<Finished<R::Image>>,
    workers: Vec<JoinHandle<()>>,
}

impl<R: Renderer> RenderCache<R> {
    pub fn new(
        renderer: Arc<R>,
        store: Arc<dyn ImageStore<R::Image>>,
        config: RenderConfig,
    ) -> Result<Self, RenderError> {
        let (finished_sender, finished) = mpsc::channel();
        let mut jobs = None;
        let mut workers = Vec::with_capacity(config.worker_threads);

        if config.worker_threads > 0 {
            let (job_sender, job_receiver) = mpsc::channel();
            let job_receiver = Arc::new(Mutex::new(job_receiver));
            for index in 0..config.worker_threads {
                let worker = Worker {
                    renderer: renderer.clone(),
                    jobs: job_receiver.clone(),
                    finished: finished_sender.clone(),
                };
                let handle = thread::Builder::new()
                    .name(format!("render-worker-{}", index))
                    .spawn(move || worker.run())
                    .map_err(|source| RenderError::Spawn { index, source })?;
                workers.push(handle);
            }
            jobs = Some(job_sender);
            debug!("Render cache started {} workers", config.worker_threads);
        }

        Ok(Self {
            renderer,
            store,
            config,
            memory: HashMap::new(),
            pending: BTreeMap::new(),
            in_flight: HashSet::new(),
            jobs,
            finished,
            workers,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    // Keys

    /// Key of one frame of an animated element, or the element key itself
    pub fn sprite_frame_key(&self, element_key: &str, frame: Option<u32>) -> String {
        match frame {
            Some(frame) => format!("{}{}{}", element_key, self.config.frame_separator, frame),
            None => element_key.to_string(),
        }
    }

    /// Number of consecutive frames the renderer has for `element_key`,
    /// counting from the frame base index
    pub fn frame_count(&self, element_key: &str) -> u32 {
        let mut frame = self.config.frame_base_index;
        while self
            .renderer
            .element_exists(&self.sprite_frame_key(element_key, Some(frame)))
        {
            frame += 1;
        }
        frame - self.config.frame_base_index
    }

    // Requests

    /// Asks for `element_key` (or one frame of it) at `size` on behalf of
    /// `sprite`. A new request replaces whatever the sprite was still
    /// waiting for.
    pub fn request(
        &mut self,
        sprite: SpriteId,
        element_key: &str,
        frame: Option<u32>,
        size: Size,
    ) -> RenderStatus<R::Image> {
        self.pending.remove(&sprite);
        if size.is_empty() {
            return RenderStatus::Empty;
        }

        let element_key = self.sprite_frame_key(element_key, frame);
        let cache_key = cache_key(size, &element_key);
        if let Some(image) = self.lookup(&cache_key) {
            return RenderStatus::Ready(image);
        }

        if self.jobs.is_none() {
            return match self.render_into_cache(&cache_key, &element_key, size) {
                Some(image) => RenderStatus::Ready(image),
                None => RenderStatus::Empty,
            };
        }

        self.pending.insert(sprite, cache_key.clone());
        if !self.in_flight.contains(&cache_key) && !self.start_job(&cache_key, element_key, size) {
            self.pending.remove(&sprite);
            return RenderStatus::Empty;
        }
        RenderStatus::Pending
    }

    /// Looks up or renders a sprite on the calling thread, bypassing the
    /// worker pool
    pub fn render_now(&mut self, element_key: &str, frame: Option<u32>, size: Size) -> Option<R::Image> {
        if size.is_empty() {
            return None;
        }
        let element_key = self.sprite_frame_key(element_key, frame);
        let cache_key = cache_key(size, &element_key);
        self.lookup(&cache_key)
            .or_else(|| self.render_into_cache(&cache_key, &element_key, size))
    }

    /// Stops waiting on behalf of `sprite`. A job already running still fills
    /// the caches.
    pub fn cancel(&mut self, sprite: SpriteId) -> bool {
        self.pending.remove(&sprite).is_some()
    }

    pub fn is_waiting(&self, sprite: SpriteId) -> bool {
        self.pending.contains_key(&sprite)
    }

    /// Sprites waiting for a render job
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether no render job is running
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    // Deliveries

    /// Collects finished render jobs without blocking
    pub fn poll(&mut self) -> Vec<Delivery<R::Image>> {
        let mut deliveries = Vec::new();
        while let Ok(finished) = self.finished.try_recv() {
            self.complete(finished, &mut deliveries);
        }
        deliveries
    }

    /// Blocks until at least one render job finishes or `timeout` passes,
    /// then collects every finished job
    pub fn wait(&mut self, timeout: Duration) -> Vec<Delivery<R::Image>> {
        if self.is_idle() {
            return Vec::new();
        }
        let mut deliveries = Vec::new();
        match self.finished.recv_timeout(timeout) {
            Ok(finished) => self.complete(finished, &mut deliveries),
            Err(RecvTimeoutError::Timeout) => return deliveries,
            Err(RecvTimeoutError::Disconnected) => {
                error!("Render workers are gone, {} jobs lost", self.in_flight.len());
                return deliveries;
            }
        }
        deliveries.extend(self.poll());
        deliveries
    }

    // Memory tier

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Forgets every image held in memory, e.g. after a theme change. The
    /// persistent store is left alone.
    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    fn lookup(&mut self, cache_key: &str) -> Option<R::Image> {
        if let Some(image) = self.memory.get(cache_key) {
            return Some(image.clone());
        }
        let image = self.store.find(cache_key)?;
        trace!("Render cache: {} found in persistent store", cache_key);
        self.memory.insert(cache_key.to_string(), image.clone());
        Some(image)
    }

    fn render_into_cache(&mut self, cache_key: &str, element_key: &str, size: Size) -> Option<R::Image> {
        let Some(image) = render_guarded(self.renderer.as_ref(), element_key, size) else {
            warn!("Could not render {}", cache_key);
            return None;
        };
        self.store.insert(cache_key, &image);
        self.memory.insert(cache_key.to_string(), image.clone());
        Some(image)
    }

    fn start_job(&mut self, cache_key: &str, element_key: String, size: Size) -> bool {
        let job = Job {
            cache_key: cache_key.to_string(),
            element_key,
            size,
        };
        let sent = self
            .jobs
            .as_ref()
            .is_some_and(|jobs| jobs.send(job).is_ok());
        if !sent {
            error!("Render workers are gone, cannot render {}", cache_key);
            return false;
        }
        trace!("Render job started for {}", cache_key);
        self.in_flight.insert(cache_key.to_string());
        true
    }

    fn complete(&mut self, finished: Finished<R::Image>, deliveries: &mut Vec<Delivery<R::Image>>) {
        let Finished { cache_key, image } = finished;
        self.in_flight.remove(&cache_key);
        match &image {
            Some(image) => {
                self.store.insert(&cache_key, image);
                self.memory.insert(cache_key.clone(), image.clone());
            }
            None => warn!("Could not render {}", cache_key),
        }

        let waiting: Vec<SpriteId> = self
            .pending
            .iter()
            .filter(|(_, key)| **key == cache_key)
            .map(|(sprite, _)| *sprite)
            .collect();
        for sprite in waiting {
            self.pending.remove(&sprite);
            deliveries.push(Delivery {
                sprite,
                cache_key: cache_key.clone(),
                image: image.clone(),
            });
        }
    }
}

impl<R: Renderer> Drop for RenderCache<R> {
    fn drop(&mut self) {
        // closing the job channel ends the workers
        self.jobs = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Render worker panicked");
            }
        }
    }
}

/// `"<width>-<height>-<element key>"`
fn cache_key(size: Size, element_key: &str) -> String {
    format!("{}-{}-{}", size.width, size.height, element_key)
}

fn render_guarded<R: Renderer>(renderer: &R, element_key: &str, size: Size) -> Option<R::Image> {
    match panic::catch_unwind(AssertUnwindSafe(|| renderer.render(element_key, size))) {
        Ok(image) => image,
        Err(_) => {
            error!("Renderer panicked while drawing {}", element_key);
            None
        }
    }
}

struct Worker<R: Renderer> {
    renderer: Arc<R>,
    jobs: Arc<Mutex<Receiver<Job>>>,
    finished: Sender<Finished<R::Image>>,
}

impl<R: Renderer> Worker<R> {
    fn run(self) {
        loop {
            let job = self
                .jobs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv();
            let Ok(job) = job else {
                trace!("Render worker exiting");
                return;
            };
            let image = render_guarded(self.renderer.as_ref(), &job.element_key, job.size);
            let finished = Finished {
                cache_key: job.cache_key,
                image,
            };
            if self.finished.send(finished).is_err() {
                return;
            }
        }
    }
}
