pub mod received_items;
pub mod shipments;

use std::sync::Arc;

use tracing::info;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::manifest::{HttpManifestExtractor, ManifestExtractor};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub shipments: Arc<crate::services::shipments::ShipmentService>,
    pub reconciliation: Arc<crate::services::reconciliation::ReconciliationService>,
    /// Present only when an extraction endpoint is configured
    pub manifest_extractor: Option<Arc<dyn ManifestExtractor>>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        manifest_extractor_url: Option<&str>,
    ) -> Self {
        let shipments = Arc::new(crate::services::shipments::ShipmentService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let reconciliation = Arc::new(crate::services::reconciliation::ReconciliationService::new(
            db_pool,
            event_sender,
        ));

        let manifest_extractor = manifest_extractor_url.map(|endpoint| {
            info!(endpoint, "Manifest extraction endpoint configured");
            Arc::new(HttpManifestExtractor::new(endpoint)) as Arc<dyn ManifestExtractor>
        });

        Self {
            shipments,
            reconciliation,
            manifest_extractor,
        }
    }
}
