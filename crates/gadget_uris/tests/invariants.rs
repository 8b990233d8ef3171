// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Properties that hold whatever the input.

use std::sync::Arc;

use container_config::SnapshotContainerConfig;
use gadget_uris::{
    ConcatPart, ConcatType, ConcatUri, ConcatUriManager, DefaultConcatUriManager, DefaultIframeUriManager,
    DefaultProxyUriManager, Gadget, GadgetContext, GadgetSpec, IframeUriManager, ProxyUri, ProxyUriManager, Uri, UriStatus,
    View, ViewContentType,
};
use rstest::rstest;

fn uri(value: &str) -> Uri {
    Uri::parse(value).unwrap()
}

fn concat_config(max_url_length: usize) -> Arc<SnapshotContainerConfig> {
    let json = format!(
        r#"{{"gadgets.container": ["default"],
            "gadgets.uri.concat.host": "concat.example.com",
            "gadgets.uri.concat.path": "/gadgets/concat",
            "gadgets.uri.concat.maxUrlLength": {max_url_length}}}"#
    );
    Arc::new(SnapshotContainerConfig::from_json(&json).unwrap())
}

#[rstest]
#[case(150)]
#[case(300)]
#[case(1000)]
#[case(2048)]
fn concat_parts_respect_max_length_and_order(#[case] max_url_length: usize) {
    let manager = DefaultConcatUriManager::new(concat_config(max_url_length));
    let batch = (0..40)
        .map(|i| uri(&format!("http://cdn.example.com/{}/{i}.css", "d".repeat(i % 7 * 10))))
        .collect::<Vec<_>>();

    let made = manager
        .make(&[ConcatUri::new("default", ConcatType::Css, batch.clone())], true)
        .unwrap();
    let parts = made[0].parts();

    for part in parts.iter().filter(|part| part.is_concatenated()) {
        assert!(part.uri().to_string().len() <= max_url_length, "{} is too long", part.uri());
    }
    let delivered = parts.iter().flat_map(ConcatPart::resources).cloned().collect::<Vec<_>>();
    assert_eq!(delivered, batch);
}

const RENDERING: &str = r#"{
    "gadgets.container": ["default"],
    "gadgets.uri.iframe.basePath": "/gadgets/ifr",
    "gadgets.uri.iframe.unlockedDomain": "unlocked.example.com",
    "gadgets.uri.iframe.lockedDomainSuffix": "-a.example.com"
}"#;

fn locked_gadget() -> Gadget {
    let url = uri("http://www.apache.org/gadget.xml");
    let spec = GadgetSpec::new(url.clone())
        .with_feature("locked-domain")
        .with_view(View::new("default", ViewContentType::Html));
    Gadget::new(GadgetContext::new("default", url), spec)
}

#[test]
fn locked_domain_follows_config_commit() {
    let config = Arc::new(SnapshotContainerConfig::from_json(RENDERING).unwrap());
    let manager = DefaultIframeUriManager::new(Arc::<SnapshotContainerConfig>::clone(&config)).with_locked_domain_enabled(true);
    let gadget = locked_gadget();

    let before = manager.make_rendering_uri(&gadget).unwrap();
    assert_eq!(before.authority(), Some("e5bld32ce9pe5ln81rjhe0d0e1vao1ba-a.example.com"));
    assert_eq!(manager.validate_rendering_uri(&before), UriStatus::ValidUnversioned);

    config
        .transaction()
        .add_containers_json(&RENDERING.replace("-a.example.com", "-b.example.com"))
        .unwrap()
        .commit()
        .unwrap();

    let after = manager.make_rendering_uri(&gadget).unwrap();
    assert_eq!(after.authority(), Some("e5bld32ce9pe5ln81rjhe0d0e1vao1ba-b.example.com"));
    assert_eq!(manager.validate_rendering_uri(&after), UriStatus::ValidUnversioned);
    assert_eq!(manager.validate_rendering_uri(&before), UriStatus::InvalidDomain);
}

#[rstest]
#[case::fragment(false)]
#[case::query(true)]
fn security_token_appears_exactly_once(#[case] in_query: bool) {
    let config = Arc::new(SnapshotContainerConfig::from_json(RENDERING).unwrap());
    let manager = DefaultIframeUriManager::new(config).with_token_for_rendering(move |_| in_query);
    let url = uri("http://example.com/gadget.xml");
    let spec = GadgetSpec::new(url.clone())
        .with_feature("security-token")
        .with_view(View::new("default", ViewContentType::Html));
    let gadget = Gadget::new(GadgetContext::new("default", url).with_security_token("s3cr3t"), spec);

    let made = manager.make_rendering_uri(&gadget).unwrap();

    assert_eq!(made.to_string().matches("st=").count(), 1, "{made}");
    assert_eq!(made.query_parameter("st").is_some(), in_query);
    assert_eq!(made.fragment_parameter("st").is_some(), !in_query);
}

#[test]
fn managers_are_shared_across_threads() {
    let config = Arc::new(
        SnapshotContainerConfig::from_json(
            r#"{"gadgets.container": ["default"],
                "gadgets.uri.proxy.host": "proxy.example.com",
                "gadgets.uri.proxy.path": "/gadgets/proxy"}"#,
        )
        .unwrap(),
    );
    let manager: Arc<dyn ProxyUriManager> = Arc::new(DefaultProxyUriManager::new(config));

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let manager = Arc::clone(&manager);
            scope.spawn(move || {
                for i in 0..50 {
                    let resource = uri(&format!("http://example.com/{worker}/{i}.png"));
                    let made = manager.make(&[ProxyUri::new("default", resource.clone())], None).unwrap();
                    assert_eq!(manager.process(&made[0]).unwrap().resource(), &resource);
                }
            });
        }
    });
}
