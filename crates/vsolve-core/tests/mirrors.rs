use vsolve_core::mirrors::{MirrorRule, MirrorSet};

fn rule(original: &str, repo: &str) -> MirrorRule {
    MirrorRule {
        original: original.to_string(),
        repo: repo.to_string(),
        vcs: None,
    }
}

fn golang_mirrors() -> MirrorSet {
    MirrorSet::new(vec![
        rule("https://golang.org/x", "https://github.com/golang"),
        rule("https://google.golang.org", "https://github.com/google"),
        rule("https://google.golang.org/grpc", "https://github.com/grpc/grpc-go"),
    ])
}

#[test]
fn prefix_rule_appends_remainder() {
    let rw = golang_mirrors().get("https://golang.org/x/tools").unwrap();
    assert_eq!(rw.repo, "https://github.com/golang/tools");
}

#[test]
fn unknown_address_is_not_rewritten() {
    assert!(golang_mirrors().get("https://unknown").is_none());
}

#[test]
fn more_specific_rule_wins() {
    let rw = golang_mirrors().get("https://google.golang.org/grpc").unwrap();
    assert_eq!(rw.repo, "https://github.com/grpc/grpc-go");
}

#[test]
fn shorter_rule_covers_other_subpaths() {
    let rw = golang_mirrors().get("https://google.golang.org/test/fake").unwrap();
    assert_eq!(rw.repo, "https://github.com/google/test/fake");
}

#[test]
fn prefix_must_end_at_path_boundary() {
    assert!(golang_mirrors().get("https://golang.org/xerrors").is_none());
}

#[test]
fn serialized_rules_are_sorted() {
    let set = MirrorSet::from_toml_str(
        r#"
[[repos]]
original = "github.com/Masterminds/semver"
repo = "file:///path/to/local/repo"
vcs = "git"

[[repos]]
original = "github.com/Masterminds/atest"
repo = "github.com/example/atest"
"#,
    )
    .unwrap();
    let out = set.to_toml_string().unwrap();
    let atest = out.find("Masterminds/atest").unwrap();
    let semver = out.find("Masterminds/semver").unwrap();
    assert!(atest < semver, "got:\n{out}");
    assert_eq!(set.get("github.com/Masterminds/semver").unwrap().vcs.as_deref(), Some("git"));
}

#[test]
fn later_duplicate_replaces_earlier() {
    let set = MirrorSet::new(vec![rule("a.example/x", "first"), rule("a.example/x", "second")]);
    assert_eq!(set.len(), 1);
    assert_eq!(set.get("a.example/x").unwrap().repo, "second");
}

#[test]
fn load_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let set = MirrorSet::load(&dir.path().join("mirrors.toml")).unwrap();
    assert!(set.is_empty());
}

#[test]
fn load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirrors.toml");
    std::fs::write(
        &path,
        "[[repos]]\noriginal = \"https://golang.org/x\"\nrepo = \"https://github.com/golang\"\n",
    )
    .unwrap();
    let set = MirrorSet::load(&path).unwrap();
    assert_eq!(set.len(), 1);
}

#[test]
fn malformed_file_is_a_config_error() {
    let err = MirrorSet::from_toml_str("[[repos]]\noriginal = 3\n").unwrap_err();
    assert!(err.to_string().contains("Configuration error"), "got: {err}");
}
