pub mod api;
pub mod hold;
pub mod model;
pub mod service;
pub mod specrule;

use std::sync::Arc;

use axum::Router;
use labqc_core::Module;

use service::LabService;

/// Lab module — products, test batches, holds, certificates, and reports.
pub struct LabModule {
    service: Arc<LabService>,
}

impl LabModule {
    pub fn new(service: Arc<LabService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> Arc<LabService> {
        self.service.clone()
    }
}

impl Module for LabModule {
    fn name(&self) -> &str {
        "lab"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}
