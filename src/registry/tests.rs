use super::{
    check_dependency, CrateInfo, CrateVersion, DependencyIssue, InMemoryRegistry, Op, Version,
    VersionError, VersionReq,
};

fn version(text: &str) -> Version {
    Version::parse(text).expect("version")
}

fn req(text: &str) -> VersionReq {
    VersionReq::parse(text).expect("requirement")
}

fn matching<'a>(requirement: &str, versions: &[&'a str]) -> Vec<&'a str> {
    let parsed = req(requirement);
    versions
        .iter()
        .copied()
        .filter(|text| parsed.matches(&version(text)))
        .collect()
}

const VERSIONS: &[&str] = &[
    "0.0.3", "0.0.4", "0.2.3", "0.2.9", "0.3.0", "1.0.0", "1.2.3", "1.2.7", "1.3.0", "1.9.9",
    "2.0.0",
];

#[test]
fn versions_parse_and_order() {
    let parsed = version("1.2.3-alpha.10+build.5");
    assert_eq!((parsed.major, parsed.minor, parsed.patch), (1, 2, 3));
    assert_eq!(parsed.build.as_deref(), Some("build.5"));
    assert_eq!(parsed.to_string(), "1.2.3-alpha.10+build.5");

    let mut ordered = vec![
        version("1.0.0"),
        version("1.0.0-beta"),
        version("1.0.0-alpha.10"),
        version("1.0.0-alpha.2"),
        version("1.0.0-alpha"),
        version("0.9.9"),
    ];
    ordered.sort();
    let rendered: Vec<String> = ordered.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["0.9.9", "1.0.0-alpha", "1.0.0-alpha.2", "1.0.0-alpha.10", "1.0.0-beta", "1.0.0"]
    );
    assert_eq!(version("1.0.0+a"), version("1.0.0+b"));
}

#[test]
fn malformed_versions_are_rejected() {
    for text in ["1.2", "1.2.3.4", "a.b.c", "1.2.3-", ""] {
        assert_eq!(Version::parse(text), Err(VersionError::Version(text.to_string())));
    }
    for text in ["1.*.3", "~>1.2", "1.2,", ">=1.2.3 <2"] {
        assert!(VersionReq::parse(text).is_err(), "accepted `{text}`");
    }
}

#[test]
fn bare_versions_mean_caret() {
    assert_eq!(req("1.2.3").comparators[0].op, Op::Caret);
    assert_eq!(matching("1.2.3", VERSIONS), vec!["1.2.3", "1.2.7", "1.3.0", "1.9.9"]);
    assert_eq!(matching("^0.2.3", VERSIONS), vec!["0.2.3", "0.2.9"]);
    assert_eq!(matching("^0.0.3", VERSIONS), vec!["0.0.3"]);
    assert_eq!(matching("^0.0", VERSIONS), vec!["0.0.3", "0.0.4"]);
    assert_eq!(matching("1", VERSIONS), vec!["1.0.0", "1.2.3", "1.2.7", "1.3.0", "1.9.9"]);
}

#[test]
fn tilde_and_wildcards() {
    assert_eq!(matching("~1.2.3", VERSIONS), vec!["1.2.3", "1.2.7"]);
    assert_eq!(matching("~1.2", VERSIONS), vec!["1.2.3", "1.2.7"]);
    assert_eq!(matching("~0", VERSIONS), vec!["0.0.3", "0.0.4", "0.2.3", "0.2.9", "0.3.0"]);
    assert_eq!(matching("1.2.*", VERSIONS), vec!["1.2.3", "1.2.7"]);
    assert_eq!(matching("1.x", VERSIONS), matching("1", VERSIONS));
    assert_eq!(matching("*", VERSIONS).len(), VERSIONS.len());
    assert_eq!(req("1.2.*").to_string(), "1.2.*");
    assert_eq!(req("*").to_string(), "*");
}

#[test]
fn comparison_operators_combine() {
    assert_eq!(matching("=1.2.3", VERSIONS), vec!["1.2.3"]);
    assert_eq!(matching("=1.2", VERSIONS), vec!["1.2.3", "1.2.7"]);
    assert_eq!(matching(">1.2", VERSIONS), vec!["1.3.0", "1.9.9", "2.0.0"]);
    assert_eq!(matching(">= 1.2.7, < 2", VERSIONS), vec!["1.2.7", "1.3.0", "1.9.9"]);
    assert_eq!(matching("<=0.2", VERSIONS), vec!["0.0.3", "0.0.4", "0.2.3", "0.2.9"]);
    assert_eq!(matching("<1.0.0", VERSIONS).len(), 5);
    assert_eq!(req(">= 1.2.7, < 2").to_string(), ">=1.2.7, <2");
}

#[test]
fn prereleases_need_a_comparator_on_the_same_release() {
    let candidates = ["1.2.3-alpha.1", "1.2.3-beta", "1.2.4-alpha", "1.2.3"];
    assert_eq!(matching(">=1.2.3-alpha.2", &candidates), vec!["1.2.3-beta", "1.2.3"]);
    assert_eq!(matching("^1.2.3-beta", &candidates), vec!["1.2.3-beta", "1.2.3"]);
    assert_eq!(matching("^1.2.0", &candidates), vec!["1.2.3"]);
    assert_eq!(matching("<1.2.3", &candidates), Vec::<&str>::new());
}

fn registry() -> InMemoryRegistry {
    InMemoryRegistry::from_toml(
        r#"
        [[crate]]
        name = "serde"
        versions = [
            { version = "1.0.100" },
            { version = "1.0.150", features = ["derive"] },
            { version = "1.0.151", yanked = true },
            { version = "2.0.0-rc.1" },
        ]

        [[crate]]
        name = "empty"
        "#,
    )
    .expect("index")
}

#[test]
fn dependencies_pick_the_newest_matching_version() {
    let registry = registry();
    assert_eq!(registry.len(), 2);
    let picked = check_dependency(&registry, "serde", "1.0.120").expect("match");
    assert_eq!(picked.version, version("1.0.151"));
    assert!(picked.is_yanked);
    let exact = check_dependency(&registry, "serde", "=1.0.150").expect("match");
    assert_eq!(exact.features, vec!["derive".to_string()]);
    let pre = check_dependency(&registry, "serde", "2.0.0-rc.1").expect("match");
    assert!(pre.version.is_prerelease());
}

#[test]
fn dependency_issues_name_the_problem() {
    let registry = registry();
    let missing = check_dependency(&registry, "serd", "1").expect_err("missing crate");
    assert_eq!(missing.to_string(), "Crate serd not found");
    let none = check_dependency(&registry, "serde", "^3").expect_err("no version");
    assert_eq!(none.to_string(), "No version found matching ^3");
    let empty = check_dependency(&registry, "empty", "*").expect_err("no versions");
    assert!(matches!(empty, DependencyIssue::NoMatchingVersion { .. }));
    let invalid = check_dependency(&registry, "serde", "one").expect_err("bad requirement");
    assert_eq!(invalid.to_string(), "invalid version requirement `one`");
}

#[test]
fn unparsable_index_versions_are_skipped() {
    let registry = InMemoryRegistry::from_toml(
        r#"
        [[crate]]
        name = "log"
        versions = [
            { version = "0.4.17" },
            { version = "not-a-version", yanked = true },
            { version = "0.4" },
            { version = "0.4.20", features = ["std"] },
        ]
        "#,
    )
    .expect("index");
    let picked = check_dependency(&registry, "log", "0.4").expect("match");
    assert_eq!(picked.version, version("0.4.20"));
    assert_eq!(picked.features, vec!["std".to_string()]);
    let older = check_dependency(&registry, "log", "<0.4.20").expect("match");
    assert_eq!(older.version, version("0.4.17"));
    assert!(!older.is_yanked);
}

#[test]
fn registries_can_be_built_in_code() {
    let mut registry = InMemoryRegistry::new();
    assert!(registry.is_empty());
    registry.insert(
        "tiny",
        CrateInfo {
            versions: vec![CrateVersion {
                version: Version::new(0, 1, 0),
                is_yanked: false,
                features: Vec::new(),
            }],
        },
    );
    let picked = check_dependency(&registry, "tiny", "0.1").expect("match");
    assert_eq!(picked.version.to_string(), "0.1.0");
}
