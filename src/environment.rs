//! Emulated browser environment shared by every preview mount.
//!
//! The environment owns the document, the timer queue and the capability
//! set. Script engines read the capability set when they build their
//! globals, so a capability that is absent here is absent in the sandbox.

use crate::crypto::{select_uuid_source, UuidSource};
use crate::dom::Document;
use crate::timers::TimerQueue;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeSet;
use std::fmt;

pub const SANDBOX_URL: &str = "https://marketplace.mock/";

/// Browser features patched in when the environment lacks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    StructuredClone,
    Range,
    AnimationFrame,
    MutationObserver,
    RandomUuid,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::StructuredClone,
        Capability::Range,
        Capability::AnimationFrame,
        Capability::MutationObserver,
        Capability::RandomUuid,
    ];

    /// Global name the capability is exposed under.
    pub fn global_name(&self) -> &'static str {
        match self {
            Capability::StructuredClone => "structuredClone",
            Capability::Range => "Range",
            Capability::AnimationFrame => "requestAnimationFrame",
            Capability::MutationObserver => "MutationObserver",
            Capability::RandomUuid => "crypto.randomUUID",
        }
    }
}

pub struct BrowserEnvironment {
    document: RefCell<Document>,
    timers: RefCell<TimerQueue>,
    url: String,
    capabilities: RefCell<BTreeSet<Capability>>,
    uuid: RefCell<Option<Box<dyn UuidSource>>>,
    closed: Cell<bool>,
}

impl fmt::Debug for BrowserEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserEnvironment")
            .field("url", &self.url)
            .field("capabilities", &self.capabilities.borrow())
            .field("pending_timers", &self.timers.borrow().len())
            .field("closed", &self.closed.get())
            .finish()
    }
}

impl Default for BrowserEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserEnvironment {
    /// A bare environment: empty document, no optional capabilities.
    pub fn new() -> Self {
        Self {
            document: RefCell::new(Document::new()),
            timers: RefCell::new(TimerQueue::new()),
            url: SANDBOX_URL.to_string(),
            capabilities: RefCell::new(BTreeSet::new()),
            uuid: RefCell::new(None),
            closed: Cell::new(false),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Installs a UUID source and marks `RandomUuid` as present.
    pub fn with_uuid_source(self, source: Box<dyn UuidSource>) -> Self {
        *self.uuid.borrow_mut() = Some(source);
        self.capabilities.borrow_mut().insert(Capability::RandomUuid);
        self
    }

    pub fn with_capability(self, capability: Capability) -> Self {
        self.capabilities.borrow_mut().insert(capability);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.document.borrow_mut()
    }

    pub fn timers(&self) -> RefMut<'_, TimerQueue> {
        self.timers.borrow_mut()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.borrow().contains(&capability)
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.capabilities.borrow().iter().copied().collect()
    }

    /// Adds every capability that is missing and returns the ones added.
    /// Running it again adds nothing.
    pub fn patch_missing_capabilities(&self) -> Vec<Capability> {
        let mut patched = Vec::new();
        for capability in Capability::ALL {
            if self.has_capability(capability) {
                continue;
            }
            if capability == Capability::RandomUuid {
                let source = select_uuid_source();
                if !source.is_strong() {
                    log::warn!("crypto.randomUUID uses a non-cryptographic generator");
                }
                *self.uuid.borrow_mut() = Some(source);
            }
            self.capabilities.borrow_mut().insert(capability);
            log::debug!("patched missing capability {}", capability.global_name());
            patched.push(capability);
        }
        patched
    }

    /// `None` when `RandomUuid` has not been patched in.
    pub fn random_uuid(&self) -> Option<String> {
        self.uuid.borrow().as_ref().map(|source| source.random_uuid())
    }

    /// Drains pending timers and clears the document.
    pub fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        let dropped = self.timers.borrow_mut().clear();
        self.document.borrow_mut().clear();
        log::info!("closed browser environment ({} pending timers dropped)", dropped);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}
