/// End-to-end tests of the loader generated by build.rs

use fixture_alpha::{FeatureFlags, Greeter};
use fixture_beta::Clock;
use fixture_gamma::Metrics;
use installgen_abstractions::ServiceKey;
use installgen_integration_tests::container::RecordingContainer;
use installgen_integration_tests::wiring::{Attempted, CoreConfig, Loader};

#[test]
fn test_every_installer_runs_in_order() {
    let mut container = RecordingContainer::new();
    let _ = Loader::load_all(&mut container);

    assert_eq!(
        container.services(),
        vec![
            ServiceKey::of::<Clock>(),
            ServiceKey::of::<Attempted>(),
            ServiceKey::of::<CoreConfig>(),
            ServiceKey::of::<dyn Greeter>(),
            ServiceKey::of::<FeatureFlags>(),
            ServiceKey::of::<Metrics>(),
        ]
    );
    assert_eq!(
        container.kinds(),
        ["instance", "type", "instance", "factory", "instance", "type"]
    );
}

#[test]
fn test_failure_is_aggregated_after_all_installers_ran() {
    let mut container = RecordingContainer::new();
    let err = Loader::load_all(&mut container).unwrap_err();

    assert_eq!(err.len(), 1);
    let failure = &err.failures()[0];
    assert_eq!(failure.installer(), "installgen_integration_tests::wiring::BrokenInstaller");
    assert_eq!(failure.inner().to_string(), "database unreachable");
    assert_eq!(
        failure.to_string(),
        "installer `installgen_integration_tests::wiring::BrokenInstaller` failed during execution"
    );
    // installers after the broken one still ran
    assert!(container.resolve::<Metrics>().is_some());
}

#[test]
fn test_registrations_resolve() {
    let mut container = RecordingContainer::new();
    let _ = Loader::load_all(&mut container);

    assert_eq!(*container.resolve::<Clock>().unwrap(), Clock { zone: "UTC" });
    assert_eq!(container.resolve::<dyn Greeter>().unwrap().greet(), "hello");
    assert_eq!(container.resolve::<CoreConfig>().unwrap().name, "core");
    assert_eq!(container.resolve::<Metrics>().unwrap().prefix, "");
}

#[test]
fn test_generated_loader_is_deterministic() {
    let first = {
        let mut container = RecordingContainer::new();
        let _ = Loader::load_all(&mut container);
        container.services()
    };
    let mut container = RecordingContainer::new();
    let _ = Loader::load_all(&mut container);
    assert_eq!(container.services(), first);
}
