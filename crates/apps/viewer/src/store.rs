use std::collections::BTreeMap;

use runtime::{Observable, SubscriptionId};
use streaming::{
    ContributionFilter, ModelConfiguration, ResourceLocator, UserIdentity, parse_year, resolve,
    sanitize_year,
};
use tracing::debug;

/// What the viewer should be showing for a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelTarget {
    /// No year selected; nothing is requested.
    NoYear,
    /// A filter needing work data is selected but availability for the year
    /// is not known yet.
    AwaitingAvailability { year: u32 },
    Model(ResourceLocator),
}

/// Everything the configuration store owns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerSelection {
    pub model: ModelConfiguration,
    pub user: Option<UserIdentity>,
    work_available: BTreeMap<u32, bool>,
}

impl ViewerSelection {
    /// `None` when availability for `year` has not been recorded.
    pub fn work_available(&self, year: u32) -> Option<bool> {
        self.work_available.get(&year).copied()
    }

    pub fn target(&self) -> ModelTarget {
        let Some(year) = self.model.year else {
            return ModelTarget::NoYear;
        };
        if self.model.contributions.requires_work_data() && self.work_available(year) != Some(true) {
            return ModelTarget::AwaitingAvailability { year };
        }
        ModelTarget::Model(resolve(&self.model))
    }

    /// Locator of the current selection, if a year is selected.
    pub fn locator(&self) -> Option<ResourceLocator> {
        self.model.year.map(|_| resolve(&self.model))
    }

    /// Filters other than `All` are dropped when there is no year or the year
    /// is known to have no work data.
    fn normalized(mut self) -> Self {
        if self.model.contributions.requires_work_data() {
            let unavailable = match self.model.year {
                None => true,
                Some(year) => self.work_available(year) == Some(false),
            };
            if unavailable {
                debug!(
                    year = ?self.model.year,
                    filter = %self.model.contributions,
                    "contribution filter not available, using all"
                );
                self.model.contributions = ContributionFilter::All;
            }
        }
        self
    }
}

/// Single owner of the user's selection.
///
/// Every setter is one atomic mutation: it either leaves the state untouched
/// (no version bump, no notification) or commits a consistent new state and
/// notifies subscribers synchronously in registration order. Setters return
/// whether anything changed.
#[derive(Debug)]
pub struct ConfigurationStore {
    state: Observable<ViewerSelection>,
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self {
            state: Observable::new(ViewerSelection::default()),
        }
    }
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> &ViewerSelection {
        self.state.get()
    }

    pub fn model(&self) -> &ModelConfiguration {
        &self.state.get().model
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.state.get().user.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.state.version()
    }

    pub fn subscribe(
        &mut self,
        f: impl FnMut(&ViewerSelection, u64) + Send + 'static,
    ) -> SubscriptionId {
        self.state.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    /// Select a year from raw input; non-positive values clear the selection.
    pub fn set_year(&mut self, raw: i64) -> bool {
        self.select_year(sanitize_year(raw))
    }

    /// Select a year from text input; anything that is not an integer clears
    /// the selection.
    pub fn set_year_text(&mut self, text: &str) -> bool {
        self.select_year(parse_year(text))
    }

    pub fn clear_year(&mut self) -> bool {
        self.select_year(None)
    }

    fn select_year(&mut self, year: Option<u32>) -> bool {
        self.mutate(|s| s.model.year = year)
    }

    pub fn set_contribution_filter(&mut self, filter: ContributionFilter) -> bool {
        self.mutate(|s| s.model.contributions = filter)
    }

    pub fn set_include_labels(&mut self, include_labels: Option<bool>) -> bool {
        self.mutate(|s| s.model.include_labels = include_labels)
    }

    pub fn set_user(&mut self, user: Option<UserIdentity>) -> bool {
        self.mutate(|s| s.user = user)
    }

    /// Record whether `year` has work data.
    pub fn record_work_availability(&mut self, year: u32, available: bool) -> bool {
        self.mutate(|s| {
            s.work_available.insert(year, available);
        })
    }

    /// Drop what is known about `year` so it is asked for again.
    pub fn forget_work_availability(&mut self, year: u32) -> bool {
        self.mutate(|s| {
            s.work_available.remove(&year);
        })
    }

    fn mutate(&mut self, f: impl FnOnce(&mut ViewerSelection)) -> bool {
        self.state.update(|current| {
            let mut next = current.clone();
            f(&mut next);
            next.normalized()
        })
    }
}
