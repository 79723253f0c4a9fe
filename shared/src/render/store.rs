use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Slow second cache tier, kept across cache instances (a disk or shared
/// memory cache in a real application)
pub trait ImageStore<I>: Send + Sync {
    fn find(&self, cache_key: &str) -> Option<I>;

    fn insert(&self, cache_key: &str, image: &I);
}

/// `ImageStore` kept in process memory
pub struct MemoryImageStore<I> {
    images: Mutex<HashMap<String, I>>,
}

impl<I> MemoryImageStore<I> {
    pub fn new() -> Self {
        Self {
            images: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, cache_key: &str) -> bool {
        self.lock().contains_key(cache_key)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, I>> {
        self.images.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I> Default for MemoryImageStore<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Clone + Send> ImageStore<I> for MemoryImageStore<I> {
    fn find(&self, cache_key: &str) -> Option<I> {
        self.lock().get(cache_key).cloned()
    }

    fn insert(&self, cache_key: &str, image: &I) {
        self.lock().insert(cache_key.to_string(), image.clone());
    }
}
