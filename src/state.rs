use crate::discovery::Discovery;
use crate::guard::CapacityGuard;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub guard: CapacityGuard,
    pub discovery: Discovery,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            guard: CapacityGuard::new(store.clone()),
            discovery: Discovery::new(store.clone()),
            store,
        }
    }
}
