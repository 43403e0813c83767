//! At-most-one-build concurrency gate over [`crate::loader::BlocklistLoader`]
//! (component F): `Empty` / `Building` / `Ready` / `Failed`, using
//! `tokio::sync::Notify` in place of the source's polling loop (SPEC_FULL.md
//! §9). A failed build's error is recorded in `Failed` and delivered to the
//! batch of callers that were waiting on it, rather than each of them
//! looping back and starting a fresh build of their own (§4.F).
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, RwLock};

use crate::config::Config;
use crate::error::{BlocklistError, Result};
use crate::filter::BlocklistFilter;
use crate::loader::BlocklistLoader;

enum WrapperState {
    Empty,
    Building,
    Ready(Arc<BlocklistFilter>),
    /// A build finished with an error; `last_exception` for the batch of
    /// callers that were waiting on it (§7). A later, genuinely new caller
    /// treats this like `Empty` and may retry.
    Failed(String),
}

/// Holds at most one built [`BlocklistFilter`] and coordinates concurrent
/// callers so only one build is ever in flight. Once `Ready`, this crate
/// keeps the state terminal (§9 Open Questions) unless [`Self::force_rebuild`]
/// is called explicitly.
pub struct BlocklistWrapper {
    state: RwLock<WrapperState>,
    notify: Notify,
    loader: BlocklistLoader,
    config: Config,
    /// Bumped once per finished build (success or failure). Lets a caller
    /// that was already waiting tell "the build I was waiting for just
    /// finished" apart from "someone else already started a new one" —
    /// without it, a waiter woken by `notify_waiters()` after a failure
    /// would see a plain `Empty`/`Failed` state and launch its own retry,
    /// turning one failed fetch into as many serial re-fetches as there
    /// were coalesced waiters.
    epoch: AtomicU64,
}

impl BlocklistWrapper {
    pub fn new(config: Config) -> Self {
        BlocklistWrapper {
            state: RwLock::new(WrapperState::Empty),
            notify: Notify::new(),
            loader: BlocklistLoader::new(),
            config,
            epoch: AtomicU64::new(0),
        }
    }

    /// Main entry point. Returns the shared filter snapshot, building it on
    /// first call. Concurrent callers during a build wait for completion,
    /// bounded by `config.download_timeout()`.
    pub async fn get(&self) -> Result<Arc<BlocklistFilter>> {
        loop {
            enum Action {
                Ready(Arc<BlocklistFilter>),
                Build,
                Wait(u64),
            }

            let action = {
                let mut guard = self.state.write().await;
                match &*guard {
                    WrapperState::Ready(filter) => Action::Ready(filter.clone()),
                    WrapperState::Building => Action::Wait(self.epoch.load(Ordering::Acquire)),
                    WrapperState::Empty | WrapperState::Failed(_) => {
                        *guard = WrapperState::Building;
                        Action::Build
                    }
                }
            };

            match action {
                Action::Ready(filter) => return Ok(filter),
                Action::Build => return self.build_and_publish().await,
                Action::Wait(seen_epoch) => {
                    let notified = self.notify.notified();
                    tokio::select! {
                        _ = notified => {
                            if self.epoch.load(Ordering::Acquire) == seen_epoch {
                                continue;
                            }
                            // A build completed while we waited: report its
                            // outcome directly rather than looping back and
                            // possibly starting a fresh one ourselves.
                            let guard = self.state.read().await;
                            match &*guard {
                                WrapperState::Ready(filter) => return Ok(filter.clone()),
                                WrapperState::Failed(msg) => return Err(BlocklistError::build_failed(msg.clone())),
                                _ => continue,
                            }
                        }
                        _ = tokio::time::sleep(self.config.download_timeout()) => {
                            return Err(BlocklistError::BuildTimeout);
                        }
                    }
                }
            }
        }
    }

    async fn build_and_publish(&self) -> Result<Arc<BlocklistFilter>> {
        let result = self.loader.load(&self.config).await;
        let mut guard = self.state.write().await;
        let outcome = match result {
            Ok(filter) => {
                let filter = Arc::new(filter);
                *guard = WrapperState::Ready(filter.clone());
                Ok(filter)
            }
            Err(err) => {
                log::warn!("blocklist build failed: {}", err);
                *guard = WrapperState::Failed(err.to_string());
                Err(err)
            }
        };
        drop(guard);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.notify.notify_waiters();
        outcome
    }

    /// Operator-driven escape hatch: discard a `Ready` snapshot so the next
    /// `get()` rebuilds (e.g. after rotating `config.latest_timestamp`).
    /// This crate otherwise treats `Ready` as terminal (§9).
    pub async fn force_rebuild(&self) {
        let mut guard = self.state.write().await;
        *guard = WrapperState::Empty;
    }

    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.read().await, WrapperState::Ready(_))
    }

    /// The error message from the most recent failed build, if the wrapper
    /// is currently sitting in `Failed` (§7's `last_exception`).
    pub async fn last_exception(&self) -> Option<String> {
        match &*self.state.read().await {
            WrapperState::Failed(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}
