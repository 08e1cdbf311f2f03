/// Fixture package reached through `fixture-alpha`.

use installgen_abstractions::{BoxError, Container, ContainerExt, Installer};

/// Built on demand through `Default`.
#[derive(Debug, Default)]
pub struct Metrics {
    pub prefix: String,
}

pub struct GammaInstaller;

impl Installer for GammaInstaller {
    fn install(&self, container: &mut dyn Container) -> Result<(), BoxError> {
        container.bind::<Metrics, Metrics>();
        Ok(())
    }
}
