/// A container that records registrations in order

use std::sync::Arc;
use installgen_abstractions::{Container, Registration, ServiceKey};

#[derive(Debug, Default)]
pub struct RecordingContainer {
    registrations: Vec<(ServiceKey, Registration)>,
}

impl RecordingContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Services in registration order
    pub fn services(&self) -> Vec<ServiceKey> {
        self.registrations.iter().map(|(key, _)| *key).collect()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|(_, r)| r.kind()).collect()
    }

    /// Resolve the most recent registration for `S`
    pub fn resolve<S>(&self) -> Option<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<S>();
        self.registrations
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .and_then(|(_, registration)| registration.instantiate::<S>(self))
    }
}

impl Container for RecordingContainer {
    fn register(&mut self, service: ServiceKey, registration: Registration) {
        self.registrations.push((service, registration));
    }
}
