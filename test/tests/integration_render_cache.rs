/// Integration tests for the sprite render cache with a worker pool

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use kgame_shared::{
    Delivery, ImageStore, MemoryImageStore, RenderCache, RenderConfig, RenderStatus, Renderer,
    Size,
};

fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// Fills every pixel with the length of the element key
#[derive(Default)]
struct SolidRenderer {
    renders: AtomicUsize,
}

impl Renderer for SolidRenderer {
    type Image = Arc<Vec<u32>>;

    fn element_exists(&self, element_key: &str) -> bool {
        !element_key.is_empty()
    }

    fn render(&self, element_key: &str, size: Size) -> Option<Self::Image> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let pixels = (size.width * size.height) as usize;
        Some(Arc::new(vec![element_key.len() as u32; pixels]))
    }
}

fn collect(cache: &mut RenderCache<SolidRenderer>) -> Vec<Delivery<Arc<Vec<u32>>>> {
    let mut deliveries = Vec::new();
    for _ in 0..100 {
        if cache.is_idle() {
            break;
        }
        deliveries.extend(cache.wait(Duration::from_millis(100)));
    }
    deliveries
}

#[test]
fn many_sprites_few_jobs() {
    init_logging();
    let renderer = Arc::new(SolidRenderer::default());
    let store = Arc::new(MemoryImageStore::new());
    let mut cache = RenderCache::new(
        renderer.clone(),
        store.clone(),
        RenderConfig {
            worker_threads: 4,
            ..RenderConfig::default()
        },
    )
    .unwrap();

    let size = Size::new(4, 4);
    for sprite in 0..20u64 {
        let frame = (sprite % 5) as u32;
        assert_eq!(
            cache.request(sprite, "tile", Some(frame), size),
            RenderStatus::Pending
        );
    }

    let deliveries = collect(&mut cache);
    assert_eq!(deliveries.len(), 20);
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 5);
    for delivery in &deliveries {
        let frame = delivery.sprite % 5;
        assert_eq!(delivery.cache_key, format!("4-4-tile_{}", frame));
        assert_eq!(delivery.image.as_ref().map(|image| image.len()), Some(16));
    }
    assert_eq!(store.len(), 5);
}

#[test]
fn persistent_store_outlives_the_cache() {
    init_logging();
    let store = Arc::new(MemoryImageStore::new());
    let size = Size::new(2, 3);
    {
        let mut cache = RenderCache::new(
            Arc::new(SolidRenderer::default()),
            store.clone(),
            RenderConfig::default(),
        )
        .unwrap();
        cache.request(1, "king", None, size);
        assert_eq!(collect(&mut cache).len(), 1);
    }
    assert!(store.find("2-3-king").is_some());

    // a new cache serves from the store without rendering
    let renderer = Arc::new(SolidRenderer::default());
    let mut cache = RenderCache::new(renderer.clone(), store, RenderConfig::default()).unwrap();
    match cache.request(2, "king", None, size) {
        RenderStatus::Ready(image) => assert_eq!(*image, vec![4; 6]),
        other => panic!("expected a cached image, got {:?}", other),
    }
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 0);
}
