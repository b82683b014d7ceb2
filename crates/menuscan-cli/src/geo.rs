//! Position source for a command-line run: the coordinate comes from flags.

use menuscan_core::{Coordinate, GeoError, GeoSource, PermissionState};
use tokio::sync::watch;

/// Reports a fixed coordinate under a fixed permission state.
pub(crate) struct FixedGeo {
    position: Coordinate,
    permission: watch::Sender<PermissionState>,
}

impl FixedGeo {
    pub(crate) fn new(position: Coordinate, permission: PermissionState) -> Self {
        let (permission, _) = watch::channel(permission);
        Self {
            position,
            permission,
        }
    }
}

impl GeoSource for FixedGeo {
    async fn current_position(&self) -> Result<Coordinate, GeoError> {
        let permission = *self.permission.borrow();
        if permission.is_blocked() {
            return Err(GeoError::PermissionDenied(permission));
        }
        Ok(self.position)
    }

    fn last_known_position(&self) -> Option<Coordinate> {
        Some(self.position)
    }

    fn permission(&self) -> PermissionState {
        *self.permission.borrow()
    }

    fn permission_changes(&self) -> watch::Receiver<PermissionState> {
        self.permission.subscribe()
    }
}
