/// Fixture package ranked first by the host's install order.

use std::sync::Arc;
use installgen_abstractions::{BoxError, Container, ContainerExt, Installer};

#[derive(Debug, PartialEq, Eq)]
pub struct Clock {
    pub zone: &'static str,
}

pub struct BetaInstaller;

impl Installer for BetaInstaller {
    fn install(&self, container: &mut dyn Container) -> Result<(), BoxError> {
        container.bind_instance(Arc::new(Clock { zone: "UTC" }));
        Ok(())
    }
}
