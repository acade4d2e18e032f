// SPDX-License-Identifier: GPL-3.0-only

//! Output surface ownership
//!
//! The preview renders into exactly one surface at a time. The broker owns
//! it: the caller asks for one through `acquire`, the camera may ask for a
//! different size through `renegotiate`, and every replacement releases the
//! old surface before the new one is published on the readiness channel.

use crate::errors::SurfaceBindError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Opaque id of a renderable surface (the caller-visible texture id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle(pub u64);

impl std::fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// The single live surface and its buffer size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceBinding {
    pub handle: SurfaceHandle,
    pub width: u32,
    pub height: u32,
}

/// Allocator for renderable surfaces (the texture registry of the host)
pub trait SurfaceFactory: Send + Sync {
    fn create(&self, width: u32, height: u32) -> Result<SurfaceHandle, SurfaceBindError>;

    /// Release a surface. Called exactly once per created handle.
    fn release(&self, handle: SurfaceHandle);
}

/// Outcome of a consumer-driven resize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renegotiation {
    /// A surface of the requested size is live
    Applied(SurfaceBinding),
    /// No surface exists yet; the size applies on the next `acquire`
    Deferred,
}

#[derive(Debug, Default)]
struct BrokerState {
    binding: Option<SurfaceBinding>,
    deferred: Option<(u32, u32)>,
}

/// Owner of the single output surface
pub struct TextureSurfaceBroker {
    factory: Arc<dyn SurfaceFactory>,
    state: Mutex<BrokerState>,
    ready: watch::Sender<Option<SurfaceBinding>>,
}

impl TextureSurfaceBroker {
    pub fn new(factory: Arc<dyn SurfaceFactory>) -> Self {
        let (ready, _) = watch::channel(None);
        Self {
            factory,
            state: Mutex::new(BrokerState::default()),
            ready,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the surface, or replace the existing one
    ///
    /// A renegotiation that arrived before any surface existed takes
    /// precedence over the requested size.
    pub fn acquire(&self, width: u32, height: u32) -> Result<SurfaceBinding, SurfaceBindError> {
        let mut state = self.lock();
        let (width, height) = match state.deferred.take() {
            Some(size) => {
                debug!(width = size.0, height = size.1, "Applying deferred renegotiation");
                size
            }
            None => (width, height),
        };
        self.replace_locked(&mut state, width, height)
    }

    /// Resize requested by the consumer of the surface (the camera)
    pub fn renegotiate(&self, width: u32, height: u32) -> Result<Renegotiation, SurfaceBindError> {
        let mut state = self.lock();
        match state.binding {
            None => {
                debug!(width, height, "No surface yet, deferring renegotiation");
                state.deferred = Some((width, height));
                Ok(Renegotiation::Deferred)
            }
            Some(current) if current.width == width && current.height == height => {
                Ok(Renegotiation::Applied(current))
            }
            Some(_) => self
                .replace_locked(&mut state, width, height)
                .map(Renegotiation::Applied),
        }
    }

    /// Release the surface. Safe to call repeatedly or with nothing bound.
    pub fn release(&self) {
        let mut state = self.lock();
        state.deferred = None;
        if let Some(old) = state.binding.take() {
            info!(handle = %old.handle, "Releasing surface");
            self.factory.release(old.handle);
            self.ready.send_replace(None);
        }
    }

    /// The live binding, if any
    pub fn current(&self) -> Option<SurfaceBinding> {
        self.lock().binding
    }

    /// Readiness channel: the value changes whenever a surface is published or released
    pub fn subscribe(&self) -> watch::Receiver<Option<SurfaceBinding>> {
        self.ready.subscribe()
    }

    fn replace_locked(
        &self,
        state: &mut BrokerState,
        width: u32,
        height: u32,
    ) -> Result<SurfaceBinding, SurfaceBindError> {
        if width == 0 || height == 0 {
            return Err(SurfaceBindError::InvalidSize { width, height });
        }

        // Old surface goes first; it must never be referenced after the new one is out
        if let Some(old) = state.binding.take() {
            debug!(handle = %old.handle, "Releasing surface before replacement");
            self.factory.release(old.handle);
            self.ready.send_replace(None);
        }

        let handle = match self.factory.create(width, height) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(width, height, error = %e, "Surface creation failed");
                return Err(e);
            }
        };

        let binding = SurfaceBinding {
            handle,
            width,
            height,
        };
        state.binding = Some(binding);
        info!(handle = %handle, width, height, "Surface published");
        self.ready.send_replace(Some(binding));
        Ok(binding)
    }
}

impl std::fmt::Debug for TextureSurfaceBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureSurfaceBroker")
            .field("state", &*self.lock())
            .finish()
    }
}
