//! Single-instance dialog bookkeeping shared by the menu handlers.
//!
//! Every editor surface has one key. The first open-request for a key builds the
//! dialog; later requests show the same instance again, so whatever state it
//! holds survives being closed.

use crate::ui::promise::{LocalBoxFuture, Promise};
use std::collections::HashMap;
use std::hash::Hash;
use std::task::Waker;
use tracing::debug;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The factory ran and the new dialog is visible.
    Created,
    /// An existing hidden dialog was made visible again.
    Shown,
    /// The dialog was already visible; nothing changed.
    AlreadyVisible,
    /// Construction started in the background.
    Deferred,
    /// A construction for this key is still in flight; the request was dropped.
    Coalesced,
}

enum Slot<D> {
    Loading(Promise<LocalBoxFuture<anyhow::Result<D>>>),
    Ready { dialog: D, visible: bool },
}

pub struct DialogRegistry<K, D> {
    slots: HashMap<K, Slot<D>>,
}

impl<K, D> Default for DialogRegistry<K, D> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<K, D> DialogRegistry<K, D>
where
    K: Copy + Eq + Hash + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn reopen(key: K, slot: &mut Slot<D>) -> OpenOutcome {
        match slot {
            Slot::Loading(_) => {
                debug!(?key, "Dialog still loading, request coalesced");
                OpenOutcome::Coalesced
            }
            Slot::Ready { visible: true, .. } => OpenOutcome::AlreadyVisible,
            Slot::Ready { visible, .. } => {
                *visible = true;
                debug!(?key, "Reshowing dialog");
                OpenOutcome::Shown
            }
        }
    }

    pub fn open_or_focus(&mut self, key: K, factory: impl FnOnce() -> D) -> OpenOutcome {
        if let Some(slot) = self.slots.get_mut(&key) {
            return Self::reopen(key, slot);
        }
        debug!(?key, "Creating dialog");
        self.slots.insert(
            key,
            Slot::Ready {
                dialog: factory(),
                visible: true,
            },
        );
        OpenOutcome::Created
    }

    /// Like [`Self::open_or_focus`], for dialogs that need background work before they
    /// can be built. The future is polled from [`Self::poll_loading`].
    pub fn open_or_focus_deferred<F>(
        &mut self,
        key: K,
        waker: &Waker,
        factory: impl FnOnce() -> F,
    ) -> OpenOutcome
    where
        F: Future<Output = anyhow::Result<D>> + 'static,
    {
        if let Some(slot) = self.slots.get_mut(&key) {
            return Self::reopen(key, slot);
        }
        debug!(?key, "Creating dialog in background");
        let future: LocalBoxFuture<anyhow::Result<D>> = Box::pin(factory());
        self.slots
            .insert(key, Slot::Loading(Promise::launched(waker.clone(), future)));
        OpenOutcome::Deferred
    }

    /// Finishes background constructions. Finished dialogs become visible; failed
    /// ones are forgotten so the next request retries, and their errors returned.
    pub fn poll_loading(&mut self) -> Vec<(K, anyhow::Error)> {
        let mut errors = Vec::new();
        let mut failed = Vec::new();
        for (key, slot) in &mut self.slots {
            let Slot::Loading(promise) = &mut *slot else {
                continue;
            };
            match promise.take_response() {
                Some(Ok(dialog)) => {
                    debug!(?key, "Background dialog ready");
                    *slot = Slot::Ready {
                        dialog,
                        visible: true,
                    };
                }
                Some(Err(e)) => {
                    failed.push(*key);
                    errors.push((*key, e));
                }
                None => {}
            }
        }
        for key in failed {
            self.slots.remove(&key);
        }
        errors
    }

    pub fn cancel_loading(&mut self, key: K) -> bool {
        if matches!(self.slots.get(&key), Some(Slot::Loading(_))) {
            self.slots.remove(&key);
            true
        } else {
            false
        }
    }

    pub fn hide(&mut self, key: K) {
        if let Some(Slot::Ready { visible, .. }) = self.slots.get_mut(&key) {
            *visible = false;
        }
    }

    pub fn is_visible(&self, key: K) -> bool {
        matches!(self.slots.get(&key), Some(Slot::Ready { visible: true, .. }))
    }

    pub fn is_loading(&self, key: K) -> bool {
        matches!(self.slots.get(&key), Some(Slot::Loading(_)))
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut D> {
        match self.slots.get_mut(&key)? {
            Slot::Ready { dialog, .. } => Some(dialog),
            Slot::Loading(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Runs `show` for each visible dialog. Returning `false` hides that dialog.
    pub fn show_visible(&mut self, mut show: impl FnMut(K, &mut D) -> bool) {
        for (key, slot) in &mut self.slots {
            if let Slot::Ready { dialog, visible } = slot
                && *visible
            {
                *visible = show(*key, dialog);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    enum Key {
        Terrain,
        Trees,
    }

    #[derive(Default)]
    struct FakeDialog {
        height_scale: f32,
    }

    fn noop_waker() -> Waker {
        Waker::noop().clone()
    }

    #[test]
    fn second_open_reuses_the_first_instance() {
        let mut registry = DialogRegistry::new();
        let mut constructed = 0;
        let mut factory = || {
            constructed += 1;
            FakeDialog::default()
        };

        assert_eq!(
            registry.open_or_focus(Key::Terrain, &mut factory),
            OpenOutcome::Created
        );
        assert_eq!(
            registry.open_or_focus(Key::Terrain, &mut factory),
            OpenOutcome::AlreadyVisible
        );

        assert_eq!(constructed, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn visible_dialog_is_drawn_once() {
        let mut registry = DialogRegistry::new();
        registry.open_or_focus(Key::Terrain, FakeDialog::default);
        registry.open_or_focus(Key::Terrain, FakeDialog::default);

        let mut drawn = Vec::new();
        registry.show_visible(|key, _| {
            drawn.push(key);
            true
        });
        assert_eq!(drawn, vec![Key::Terrain]);
    }

    #[test]
    fn state_survives_hide_and_show() {
        let mut registry = DialogRegistry::new();
        registry.open_or_focus(Key::Terrain, FakeDialog::default);
        registry.get_mut(Key::Terrain).unwrap().height_scale = 42.0;

        registry.hide(Key::Terrain);
        assert!(!registry.is_visible(Key::Terrain));

        let outcome = registry.open_or_focus(Key::Terrain, || panic!("must not rebuild"));
        assert_eq!(outcome, OpenOutcome::Shown);
        assert!(registry.is_visible(Key::Terrain));
        assert_eq!(registry.get_mut(Key::Terrain).unwrap().height_scale, 42.0);
    }

    #[test]
    fn closing_through_show_hides_without_dropping() {
        let mut registry = DialogRegistry::new();
        registry.open_or_focus(Key::Terrain, FakeDialog::default);
        registry.show_visible(|_, _| false);

        assert!(!registry.is_visible(Key::Terrain));
        assert_eq!(registry.len(), 1);

        let mut drawn = 0;
        registry.show_visible(|_, _| {
            drawn += 1;
            true
        });
        assert_eq!(drawn, 0);
    }

    #[test]
    fn keys_are_independent() {
        let mut registry = DialogRegistry::new();
        registry.open_or_focus(Key::Terrain, FakeDialog::default);
        assert_eq!(
            registry.open_or_focus(Key::Trees, FakeDialog::default),
            OpenOutcome::Created
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn deferred_open_coalesces_while_loading() {
        let mut registry: DialogRegistry<Key, FakeDialog> = DialogRegistry::new();
        let waker = noop_waker();
        let mut constructed = 0;

        let outcome = registry.open_or_focus_deferred(Key::Trees, &waker, || {
            constructed += 1;
            future::pending()
        });
        assert_eq!(outcome, OpenOutcome::Deferred);
        assert!(registry.poll_loading().is_empty());

        let outcome = registry.open_or_focus_deferred(Key::Trees, &waker, || {
            constructed += 1;
            future::pending()
        });
        assert_eq!(outcome, OpenOutcome::Coalesced);
        assert_eq!(
            registry.open_or_focus(Key::Trees, FakeDialog::default),
            OpenOutcome::Coalesced
        );
        assert_eq!(constructed, 1);
        assert!(registry.is_loading(Key::Trees));
        assert!(registry.get_mut(Key::Trees).is_none());
    }

    #[test]
    fn deferred_dialog_becomes_visible_when_ready() {
        let mut registry = DialogRegistry::new();
        registry.open_or_focus_deferred(Key::Trees, &noop_waker(), || {
            future::ready(Ok(FakeDialog { height_scale: 3.0 }))
        });

        assert!(registry.poll_loading().is_empty());
        assert!(registry.is_visible(Key::Trees));
        assert_eq!(registry.get_mut(Key::Trees).unwrap().height_scale, 3.0);
    }

    #[test]
    fn failed_deferred_open_is_reported_and_retried() {
        let mut registry: DialogRegistry<Key, FakeDialog> = DialogRegistry::new();
        registry.open_or_focus_deferred(Key::Trees, &noop_waker(), || {
            future::ready(Err(anyhow::anyhow!("scan failed")))
        });

        let errors = registry.poll_loading();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, Key::Trees);
        assert_eq!(registry.len(), 0);

        assert_eq!(
            registry.open_or_focus(Key::Trees, FakeDialog::default),
            OpenOutcome::Created
        );
    }

    #[test]
    fn cancel_loading_only_affects_pending_entries() {
        let mut registry: DialogRegistry<Key, FakeDialog> = DialogRegistry::new();
        registry.open_or_focus(Key::Terrain, FakeDialog::default);
        registry.open_or_focus_deferred(Key::Trees, &noop_waker(), future::pending);

        assert!(!registry.cancel_loading(Key::Terrain));
        assert!(registry.cancel_loading(Key::Trees));
        assert_eq!(registry.len(), 1);
    }
}
