//! Run context: the snapshot store plus the state loaded from it.
//!
//! Every command runs against one [`Session`]. It decides whether the cached
//! model can be reused, rebuilds it from the catalog when it cannot, and writes
//! the snapshot back through [`Session::persist`]. Callers persist on every
//! exit path, failed runs included.

use crate::catalog::CatalogSource;
use crate::db::{Snapshot, Store};
use crate::model::{build_model, PreferenceModel};
use anyhow::{bail, Context, Result};
use log::info;

#[derive(Debug)]
pub struct Session {
    store: Store,
    snapshot: Snapshot,
    user_changed: bool,
}

impl Session {
    /// Loads the stored snapshot.
    pub fn open(store: Store) -> Result<Self> {
        let snapshot = store.load().context("Failed to load stored snapshot")?;
        Ok(Self {
            store,
            snapshot,
            user_changed: false,
        })
    }

    /// Switches to `user` if given and different from the stored one.
    pub fn select_user(&mut self, user: Option<&str>) {
        if let Some(user) = user {
            if self.snapshot.user.as_deref() != Some(user) {
                info!("Switching user to {user}");
                self.snapshot.user = Some(user.to_string());
                self.user_changed = true;
            }
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.snapshot.user.as_deref()
    }

    #[must_use]
    pub fn model(&self) -> Option<&PreferenceModel> {
        self.snapshot.model.as_ref()
    }

    /// Whether the next [`Session::ensure_model`] call will rebuild.
    #[must_use]
    pub fn needs_rebuild(&self, refresh: bool) -> bool {
        refresh || self.user_changed || self.snapshot.model.is_none()
    }

    /// Returns the preference model for the selected user.
    ///
    /// # Arguments
    ///
    /// * `source` - Catalog the rating history is fetched from on a rebuild
    /// * `refresh` - Rebuild even if a cached model exists
    /// * `progress` - Receives `(done, total)` per history entry while building
    ///
    /// # Returns
    ///
    /// * `Result<&PreferenceModel>` - The cached model, or a freshly built one
    ///
    /// # Behavior
    ///
    /// - Rebuilds when the user changed, `refresh` is set or nothing is cached
    /// - A failed rebuild leaves the previous model in place; [`Session::persist`]
    ///   then drops it rather than storing it under the new user
    ///
    /// # Errors
    ///
    /// - No user has ever been selected
    /// - The rating history cannot be fetched (a [`crate::catalog::CatalogError`]
    ///   is kept as the source)
    pub fn ensure_model<F>(
        &mut self,
        source: &dyn CatalogSource,
        refresh: bool,
        progress: F,
    ) -> Result<&PreferenceModel>
    where
        F: FnMut(usize, usize),
    {
        if self.needs_rebuild(refresh) {
            let Some(user) = self.snapshot.user.clone() else {
                bail!("No user to build the preference model from. Pass --user=<name>");
            };
            info!("Building preference model for {user}");
            let history = source
                .fetch_rating_history(&user)
                .with_context(|| format!("Failed to fetch rating history of {user}"))?;
            let model = build_model(&history, progress);
            self.snapshot.model = Some(model);
            self.user_changed = false;
        }

        self.snapshot
            .model
            .as_ref()
            .context("Preference model missing after build")
    }

    /// Writes the current snapshot to the store.
    ///
    /// A model built for a previous user is dropped when the rebuild for the
    /// newly selected user never completed.
    pub fn persist(&mut self) -> Result<()> {
        if self.user_changed && self.snapshot.model.take().is_some() {
            info!("Discarding model of the previous user");
        }
        self.store
            .save(&self.snapshot)
            .context("Failed to persist snapshot")
    }
}
