// SPDX-License-Identifier: GPL-3.0-only

//! In-process texture registry
//!
//! Hands out incrementing texture ids and remembers which are live. Used by
//! the command line front end, where nothing actually renders the preview.

use crate::errors::SurfaceBindError;
use crate::surface::{SurfaceFactory, SurfaceHandle};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    live: BTreeMap<u64, (u32, u32)>,
    created: usize,
    released: usize,
}

#[derive(Debug, Default)]
pub struct InProcessTextures {
    registry: Mutex<Registry>,
    fail_next: AtomicBool,
}

impl InProcessTextures {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handles currently allocated, in creation order
    pub fn live(&self) -> Vec<SurfaceHandle> {
        self.lock().live.keys().copied().map(SurfaceHandle).collect()
    }

    /// Buffer size of a live surface
    pub fn size_of(&self, handle: SurfaceHandle) -> Option<(u32, u32)> {
        self.lock().live.get(&handle.0).copied()
    }

    pub fn created_count(&self) -> usize {
        self.lock().created
    }

    pub fn released_count(&self) -> usize {
        self.lock().released
    }

    /// Make the next `create` fail (exercises bind error paths)
    pub fn fail_next_create(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl SurfaceFactory for InProcessTextures {
    fn create(&self, width: u32, height: u32) -> Result<SurfaceHandle, SurfaceBindError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SurfaceBindError::CreateFailed {
                width,
                height,
                reason: "texture registry refused allocation".to_string(),
            });
        }

        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.live.insert(id, (width, height));
        registry.created += 1;
        debug!(id, width, height, "Texture created");
        Ok(SurfaceHandle(id))
    }

    fn release(&self, handle: SurfaceHandle) {
        let mut registry = self.lock();
        if registry.live.remove(&handle.0).is_some() {
            registry.released += 1;
            debug!(id = handle.0, "Texture released");
        } else {
            warn!(id = handle.0, "Release of unknown texture");
        }
    }
}
