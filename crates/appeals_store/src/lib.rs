use std::sync::Arc;

use shared::{
    domain::{Appeal, AppealFields, AppealId, PremiseId},
    protocol::{AppealListQuery, ApartmentListQuery, PremiseListQuery},
};
use tokio::{
    runtime::Handle,
    sync::{broadcast, RwLock},
};
use tracing::{debug, error, info, warn};

pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use api::{AppealsApi, HttpAppealsApi};
pub use config::ClientSettings;
pub use error::ApiError;
pub use state::{AppealsState, Filters, Pagination, PaginationUpdate, SortBy, SortOrder};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notifications about command outcomes. Fetch failures are not returned to
/// anyone who does not look at the `Result`, so they are also broadcast here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    AppealsLoaded { count: usize, total: u64 },
    PremisesLoaded { count: usize },
    ApartmentsLoaded { premise_id: PremiseId, count: usize },
    AppealCreated,
    AppealUpdated { appeal_id: AppealId },
    Failed { operation: &'static str, message: String },
}

/// Client-side store for the appeals screen.
///
/// Holds the [`AppealsState`] behind a lock and runs commands against an
/// [`AppealsApi`]. The lock is never held while a request is in flight, so
/// commands interleave freely; whichever response lands last wins.
pub struct AppealsStore {
    api: Arc<dyn AppealsApi>,
    state: Arc<RwLock<AppealsState>>,
    events: broadcast::Sender<StoreEvent>,
}

impl AppealsStore {
    pub fn new(api: Arc<dyn AppealsApi>) -> Arc<Self> {
        Self::with_state(api, AppealsState::default())
    }

    pub fn with_state(api: Arc<dyn AppealsApi>, state: AppealsState) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            state: Arc::new(RwLock::new(state)),
            events,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Arc<Self>> {
        let api = HttpAppealsApi::from_settings(settings)?;
        Ok(Self::with_state(
            Arc::new(api),
            AppealsState::with_page_size(settings.page_size),
        ))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> AppealsState {
        self.state.read().await.clone()
    }

    pub async fn read<R>(&self, project: impl FnOnce(&AppealsState) -> R) -> R {
        let state = self.state.read().await;
        project(&state)
    }

    pub async fn sorted_appeals(&self) -> Vec<Appeal> {
        self.read(AppealsState::sorted_appeals).await
    }

    pub async fn is_loading(&self) -> bool {
        self.read(AppealsState::is_loading).await
    }

    async fn commit(&self, mutation: &'static str, apply: impl FnOnce(&mut AppealsState)) {
        let mut state = self.state.write().await;
        apply(&mut state);
        debug!("appeals: commit {mutation}");
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn report_failure(&self, operation: &'static str, err: &ApiError) {
        error!("appeals: {operation} failed err={err}");
        self.emit(StoreEvent::Failed {
            operation,
            message: err.to_string(),
        });
    }

    /// Loads the current page with the current filters.
    ///
    /// The loading flag is raised for the duration of the request and cleared
    /// on every exit, including when the future is dropped mid-request. On
    /// failure the error is logged and broadcast and the cached list is left
    /// as it was; callers are free to ignore the result.
    pub async fn fetch_appeals(&self) -> Result<(), ApiError> {
        self.commit("set_loading", |state| state.set_loading(true)).await;
        let loading = LoadingGuard::armed(Arc::clone(&self.state));
        let outcome = self.load_appeals_page().await;
        loading.release().await;
        outcome
    }

    async fn load_appeals_page(&self) -> Result<(), ApiError> {
        let query = self
            .read(|state| {
                let pagination = state.pagination();
                let filters = state.filters();
                AppealListQuery::new(
                    pagination.page,
                    pagination.page_size,
                    &filters.search,
                    filters.premise_id,
                )
            })
            .await;

        let page = match self.api.list_appeals(&query).await {
            Ok(page) => page,
            Err(err) => {
                self.report_failure("fetch_appeals", &err);
                return Err(err);
            }
        };

        let count = page.results.len();
        let total = page.count;
        self.commit("set_appeals", |state| {
            state.set_appeals(page.results);
            state.set_pagination(PaginationUpdate::total(total));
        })
        .await;
        self.emit(StoreEvent::AppealsLoaded { count, total });
        Ok(())
    }

    /// Loads premises matching `search`; an empty string lists all of them.
    pub async fn fetch_premises(&self, search: &str) -> Result<(), ApiError> {
        let query = PremiseListQuery {
            search: search.to_string(),
        };
        match self.api.list_premises(&query).await {
            Ok(premises) => {
                let count = premises.len();
                self.commit("set_premises", |state| state.set_premises(premises)).await;
                self.emit(StoreEvent::PremisesLoaded { count });
                Ok(())
            }
            Err(err) => {
                self.report_failure("fetch_premises", &err);
                Err(err)
            }
        }
    }

    pub async fn fetch_apartments(&self, premise_id: PremiseId) -> Result<(), ApiError> {
        match self
            .api
            .list_apartments(&ApartmentListQuery { premise_id })
            .await
        {
            Ok(apartments) => {
                let count = apartments.len();
                self.commit("set_apartments", |state| state.set_apartments(apartments)).await;
                self.emit(StoreEvent::ApartmentsLoaded { premise_id, count });
                Ok(())
            }
            Err(err) => {
                self.report_failure("fetch_apartments", &err);
                Err(err)
            }
        }
    }

    /// Creates an appeal and, on success, starts a background refresh of the
    /// list. The refresh is not awaited and its failure never reaches the
    /// caller; watch [`StoreEvent`]s to observe it.
    pub async fn create_appeal(self: &Arc<Self>, fields: &AppealFields) -> Result<(), ApiError> {
        if let Err(err) = self.api.create_appeal(fields).await {
            self.report_failure("create_appeal", &err);
            return Err(err);
        }

        info!("appeals: appeal created, refreshing list");
        self.emit(StoreEvent::AppealCreated);
        self.spawn_refresh();
        Ok(())
    }

    /// Patches an existing appeal. Same refresh and error contract as
    /// [`AppealsStore::create_appeal`].
    pub async fn update_appeal(
        self: &Arc<Self>,
        appeal_id: AppealId,
        fields: &AppealFields,
    ) -> Result<(), ApiError> {
        if let Err(err) = self.api.update_appeal(appeal_id, fields).await {
            self.report_failure("update_appeal", &err);
            return Err(err);
        }

        info!("appeals: appeal updated appeal_id={appeal_id}, refreshing list");
        self.emit(StoreEvent::AppealUpdated { appeal_id });
        self.spawn_refresh();
        Ok(())
    }

    fn spawn_refresh(self: &Arc<Self>) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            // Already logged and broadcast by fetch_appeals.
            let _ = store.fetch_appeals().await;
        });
    }

    pub async fn set_appeal_details(&self, appeal_details: Option<Appeal>) {
        self.commit("set_appeal_details", |state| {
            state.set_appeal_details(appeal_details)
        })
        .await;
    }

    pub async fn set_filters(&self, filters: &Filters) {
        self.commit("set_filters", |state| state.set_filters(filters)).await;
    }

    pub async fn set_pagination(&self, update: PaginationUpdate) {
        self.commit("set_pagination", |state| state.set_pagination(update)).await;
    }

    pub async fn set_sort_by(&self, sort_by: SortBy) {
        self.commit("set_sort_by", |state| state.set_sort_by(sort_by)).await;
    }

    pub async fn set_sort_order(&self, sort_order: SortOrder) {
        self.commit("set_sort_order", |state| state.set_sort_order(sort_order)).await;
    }

    /// Forces the loading flag on, independent of any fetch in flight.
    pub async fn set_loading_on(&self) {
        self.commit("set_loading", |state| state.set_loading(true)).await;
    }

    pub async fn set_loading_off(&self) {
        self.commit("set_loading", |state| state.set_loading(false)).await;
    }
}

/// Clears the loading flag when a fetch ends. The normal path awaits
/// [`LoadingGuard::release`]; if the fetch future is dropped instead, `Drop`
/// clears the flag in place or hands it to the runtime when the lock is busy.
struct LoadingGuard {
    state: Arc<RwLock<AppealsState>>,
    armed: bool,
}

impl LoadingGuard {
    fn armed(state: Arc<RwLock<AppealsState>>) -> Self {
        Self { state, armed: true }
    }

    async fn release(mut self) {
        self.armed = false;
        self.state.write().await.set_loading(false);
        debug!("appeals: commit set_loading");
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        if let Ok(mut state) = self.state.try_write() {
            state.set_loading(false);
            debug!("appeals: commit set_loading (fetch abandoned)");
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let state = Arc::clone(&self.state);
                handle.spawn(async move {
                    state.write().await.set_loading(false);
                    debug!("appeals: commit set_loading (fetch abandoned)");
                });
            }
            Err(_) => warn!("appeals: fetch abandoned outside a runtime, loading flag left set"),
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
