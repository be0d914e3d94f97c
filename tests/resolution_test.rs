mod fixtures;

use std::collections::BTreeSet;

use fixtures::corpus_from;
use pretty_assertions::assert_eq;
use test_api_usage::error::ResolveError;
use test_api_usage::model::{Located, TypeOracle};
use test_api_usage::{Corpus, LocatorTriple, ValueResolver};

const RESOURCES: &str = r#"package resources

import "k8s.io/apimachinery/pkg/runtime/schema"

const configGroup = "config.openshift.io"

func GVR(group, version, resource string) schema.GroupVersionResource {
	return schema.GroupVersionResource{Group: group, Version: version, Resource: resource}
}

var Images = []schema.GroupVersionResource{
	{Group: "image.openshift.io", Version: "v1", Resource: "images"},
	GVR("image.openshift.io", "v1", "imagestreams"),
}

var Owners = map[schema.GroupVersionResource]string{
	{Group: configGroup, Version: "v1", Resource: "clusteroperators"}: "cvo",
	GVR(configGroup, "v1", "infrastructures"):                        "installer",
}

var Named = map[string]schema.GroupVersionResource{
	"routes": {Group: "route.openshift.io", Version: "v1", Resource: "routes"},
}

func Pair() (schema.GroupVersionResource, error) {
	return GVR(configGroup, "v1", "networks"), nil
}

func Loop() schema.GroupVersionResource {
	return Loop()
}
"#;

const CONSUMER: &str = r#"package consumer

import (
	"k8s.io/apimachinery/pkg/runtime/schema"

	"example.com/suite/resources"
)

var images = resources.Images
var owners = resources.Owners
var named = resources.Named
var network, networkErr = resources.Pair()
var indexed = resources.Images[0]
var built = resources.GVR("build.openshift.io", "v1", "builds")
var looped = resources.Loop()
var pointer = &schema.GroupVersionResource{Group: "apps", Version: "v1", Resource: "deployments"}
"#;

const CHAIN: &str = r#"package chain

import (
	"k8s.io/apimachinery/pkg/runtime/schema"

	"example.com/suite/consumer"
)

var hop0 = schema.GroupVersionResource{Group: "operator.openshift.io", Version: "v1", Resource: "consoles"}
var hop1 = hop0
var hop2 = hop1
var hop3 = hop2
var hop4 = hop3
var hop5 = hop4
var hop6 = hop5
var hop7 = hop6
var mixed = []schema.GroupVersionResource{hop7, consumer.Pointer()}
"#;

fn corpus() -> Corpus {
    corpus_from(&[
        ("resources/resources.go", RESOURCES),
        ("consumer/consumer.go", CONSUMER),
        ("chain/chain.go", CHAIN),
    ])
}

fn initializer<'a>(corpus: &'a Corpus, pkg: &str, name: &str) -> Located<'a> {
    let spec = corpus
        .find_value_spec(&format!("example.com/suite/{pkg}"), name)
        .unwrap_or_else(|| panic!("{pkg}.{name} not declared"));
    spec.child("value")
        .and_then(|list| list.named_children().into_iter().next())
        .unwrap()
}

fn resolve(corpus: &Corpus, pkg: &str, name: &str) -> Result<BTreeSet<LocatorTriple>, ResolveError> {
    let oracle = TypeOracle::new(corpus);
    ValueResolver::default().resolve(&oracle, initializer(corpus, pkg, name))
}

fn triples(items: &[(&str, &str, &str)]) -> BTreeSet<LocatorTriple> {
    items
        .iter()
        .map(|(d, v, k)| LocatorTriple::new(*d, *v, *k))
        .collect()
}

#[test]
fn test_slice_across_packages() {
    let corpus = corpus();
    assert_eq!(
        resolve(&corpus, "consumer", "images").unwrap(),
        triples(&[
            ("image.openshift.io", "v1", "images"),
            ("image.openshift.io", "v1", "imagestreams"),
        ])
    );
}

#[test]
fn test_map_orientation() {
    let corpus = corpus();
    assert_eq!(
        resolve(&corpus, "consumer", "owners").unwrap(),
        triples(&[
            ("config.openshift.io", "v1", "clusteroperators"),
            ("config.openshift.io", "v1", "infrastructures"),
        ])
    );
    assert_eq!(
        resolve(&corpus, "consumer", "named").unwrap(),
        triples(&[("route.openshift.io", "v1", "routes")])
    );
}

#[test]
fn test_multi_value_return_selects_locator_position() {
    let corpus = corpus();
    assert_eq!(
        resolve(&corpus, "consumer", "network").unwrap(),
        triples(&[("config.openshift.io", "v1", "networks")])
    );
}

#[test]
fn test_constructor_across_packages() {
    let corpus = corpus();
    assert_eq!(
        resolve(&corpus, "consumer", "built").unwrap(),
        triples(&[("build.openshift.io", "v1", "builds")])
    );
    assert_eq!(
        resolve(&corpus, "consumer", "pointer").unwrap(),
        triples(&[("apps", "v1", "deployments")])
    );
}

#[test]
fn test_long_binding_chain() {
    let corpus = corpus();
    assert_eq!(
        resolve(&corpus, "chain", "hop7").unwrap(),
        triples(&[("operator.openshift.io", "v1", "consoles")])
    );
}

#[test]
fn test_chain_longer_than_depth_cap() {
    let mut source = String::from(
        "package long\n\nimport \"example.com/suite/chain\"\n\nvar link0 = chain.Hop7()\n",
    );
    for i in 1..=120 {
        source.push_str(&format!("var link{i} = link{}\n", i - 1));
    }
    let chain = CHAIN.replace("var hop7 = hop6", "var hop7 = hop6\n\nfunc Hop7() schema.GroupVersionResource { return hop7 }");
    let corpus = corpus_from(&[
        ("resources/resources.go", RESOURCES),
        ("consumer/consumer.go", CONSUMER),
        ("chain/chain.go", chain.as_str()),
        ("long/long.go", source.as_str()),
    ]);

    assert_eq!(
        resolve(&corpus, "long", "link120").unwrap(),
        triples(&[("operator.openshift.io", "v1", "consoles")])
    );
}

#[test]
fn test_binding_cycle_across_packages() {
    let corpus = corpus_from(&[
        ("a/a.go", "package a\n\nimport \"example.com/suite/b\"\n\nvar Left = b.Right\n"),
        ("b/b.go", "package b\n\nimport \"example.com/suite/a\"\n\nvar Right = a.Left\n"),
    ]);
    let err = resolve(&corpus, "a", "Left").unwrap_err();
    assert!(matches!(err, ResolveError::CyclicBinding { .. }), "{err:?}");
}

#[test]
fn test_depth_cap_stops_runaway_calls() {
    let corpus = corpus();
    let oracle = TypeOracle::new(&corpus);
    let resolver = ValueResolver::builder(Default::default())
        .with_max_depth(3)
        .build();
    let err = resolver
        .resolve(&oracle, initializer(&corpus, "consumer", "looped"))
        .unwrap_err();
    assert!(matches!(err, ResolveError::DepthExceeded { max_depth: 3, .. }));
}

#[test]
fn test_index_expression_is_unsupported() {
    let corpus = corpus();
    match resolve(&corpus, "consumer", "indexed").unwrap_err() {
        ResolveError::UnsupportedExpressionShape { shape, snippet, location } => {
            assert_eq!(shape, "index_expression");
            assert_eq!(snippet, "resources.Images[0]");
            assert_eq!(location.file, "consumer/consumer.go");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_unknown_callee_fails_whole_value() {
    let corpus = corpus();
    let err = resolve(&corpus, "chain", "mixed").unwrap_err();
    assert!(
        matches!(err, ResolveError::CalleeNotFound { ref callee, .. } if callee.ends_with("Pointer")),
        "{err:?}"
    );
}
