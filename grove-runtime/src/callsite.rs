//! Call sites
//!
//! Every call expression in compiled code owns one [`CallSite`]. The site
//! remembers the last resolution together with the receiver class, the meta
//! class version and the argument classes it was made for, and reuses it
//! while those stay the same. The state is an immutable record behind an
//! `Arc`; a re-resolution builds a new record and swaps the pointer, so a
//! concurrent caller uses either the old resolution or the new one.
//!
//! ```text
//! uninitialized -> cached-exact | cached-coercing -> ... -> generic
//! ```
//!
//! After `megamorphic_threshold` re-specialisations the site gives up and
//! resolves every call. While a category is active on the calling thread the
//! cache is neither read nor written.

use crate::category;
use crate::dispatch::{Resolution, Shape};
use crate::error::RuntimeResult;
use crate::runtime::Runtime;
use crate::value::{read, write, Value};
use grove_compiler::bytecode::CallSiteKind;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    shape: Shape,
    resolution: Resolution,
}

#[derive(Debug, Clone)]
pub enum SiteState {
    Uninitialized,
    /// Arguments are passed through untouched
    CachedExact(CacheEntry),
    /// Arguments are converted to the parameter types first
    CachedCoercing(CacheEntry),
    /// Constructor whose arguments need widening
    ConstructorNoUnwrap(CacheEntry),
    /// Constructor whose arguments already have the parameter types
    ConstructorNoUnwrapNoCoerce(CacheEntry),
    /// Megamorphic: full resolution on every call
    Generic,
}

impl SiteState {
    pub fn name(&self) -> &'static str {
        match self {
            SiteState::Uninitialized => "uninitialized",
            SiteState::CachedExact(_) => "cached-exact",
            SiteState::CachedCoercing(_) => "cached-coercing",
            SiteState::ConstructorNoUnwrap(_) => "constructor-no-unwrap",
            SiteState::ConstructorNoUnwrapNoCoerce(_) => "constructor-no-unwrap-no-coerce",
            SiteState::Generic => "generic",
        }
    }

    fn entry(&self) -> Option<&CacheEntry> {
        match self {
            SiteState::CachedExact(entry)
            | SiteState::CachedCoercing(entry)
            | SiteState::ConstructorNoUnwrap(entry)
            | SiteState::ConstructorNoUnwrapNoCoerce(entry) => Some(entry),
            SiteState::Uninitialized | SiteState::Generic => None,
        }
    }
}

pub struct CallSite {
    kind: CallSiteKind,
    name: String,
    /// Class whose code contains the site
    owner: String,
    state: RwLock<Arc<SiteState>>,
    specialisations: AtomicUsize,
    resolutions: AtomicUsize,
}

impl CallSite {
    pub fn new(kind: CallSiteKind, name: &str, owner: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            owner: owner.to_string(),
            state: RwLock::new(Arc::new(SiteState::Uninitialized)),
            specialisations: AtomicUsize::new(0),
            resolutions: AtomicUsize::new(0),
        }
    }

    pub fn kind(&self) -> CallSiteKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> Arc<SiteState> {
        Arc::clone(&read(&self.state))
    }

    pub fn state_name(&self) -> &'static str {
        self.state().name()
    }

    /// Full resolutions performed so far; cache hits do not count
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Invokes the site; errors come back as Grove exceptions where possible
    pub fn call(&self, rt: &Runtime, receiver: Value, arguments: Vec<Value>) -> RuntimeResult<Value> {
        self.dispatch(rt, receiver, arguments)
            .map_err(|error| rt.unwrap(error))
    }

    fn dispatch(&self, rt: &Runtime, receiver: Value, arguments: Vec<Value>) -> RuntimeResult<Value> {
        if self.kind.is_safe() && receiver.is_null() {
            return Ok(Value::Null);
        }
        let state = self.state();
        if category::is_active() || matches!(*state, SiteState::Generic) {
            self.resolutions.fetch_add(1, Ordering::Relaxed);
            return rt.dispatch(self.kind, &self.owner, &self.name, receiver, arguments);
        }

        let shape = rt.shape(self.kind, &self.name, &receiver, &arguments)?;
        if let Some(entry) = state.entry().filter(|entry| entry.shape == shape) {
            return rt.invoke(&entry.resolution, receiver, arguments);
        }

        self.resolutions.fetch_add(1, Ordering::Relaxed);
        match rt.resolve(self.kind, &self.owner, &self.name, &receiver, &arguments)? {
            Some(resolution) => {
                self.specialise(rt, &state, shape, resolution.clone());
                rt.invoke(&resolution, receiver, arguments)
            }
            None => rt.fallback(self.kind, &self.name, receiver, arguments),
        }
    }

    /// Publishes a new state for `resolution`, or gives up caching
    fn specialise(&self, rt: &Runtime, previous: &SiteState, shape: Shape, resolution: Resolution) {
        let count = self.specialisations.fetch_add(1, Ordering::Relaxed) + 1;
        let next = if count > rt.config().megamorphic_threshold {
            SiteState::Generic
        } else {
            let coerce = resolution.coerce;
            let entry = CacheEntry { shape, resolution };
            match (self.kind, coerce) {
                (CallSiteKind::Constructor, false) => SiteState::ConstructorNoUnwrapNoCoerce(entry),
                (CallSiteKind::Constructor, true) => SiteState::ConstructorNoUnwrap(entry),
                (_, false) => SiteState::CachedExact(entry),
                (_, true) => SiteState::CachedCoercing(entry),
            }
        };
        tracing::trace!(
            site = %self.name,
            owner = %self.owner,
            from = previous.name(),
            to = next.name(),
            "call site transition"
        );
        *write(&self.state) = Arc::new(next);
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("state", &self.state_name())
            .finish()
    }
}
