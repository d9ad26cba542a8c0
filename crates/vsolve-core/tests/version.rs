use vsolve_core::version::{Constraint, Version};

fn v(s: &str) -> Version {
    s.parse().unwrap()
}

fn c(s: &str) -> Constraint {
    s.parse().unwrap()
}

#[test]
fn range_admits_versions_inside_interval() {
    let range = c(">=1.0, <2.0");
    assert!(!range.admits(&v("0.9.0")));
    assert!(range.admits(&v("1.0.0")));
    assert!(range.admits(&v("1.5.0")));
    assert!(!range.admits(&v("2.0.0")));
}

#[test]
fn star_admits_everything() {
    let any = c("*");
    assert_eq!(any, Constraint::Any);
    assert!(any.admits(&v("0.0.1")));
    assert!(any.admits(&Version::branch("main")));
}

#[test]
fn branch_constraint_admits_only_that_branch() {
    let pin = c("branch:main");
    assert!(pin.admits(&Version::branch("main")));
    assert!(!pin.admits(&Version::branch("dev")));
    assert!(!pin.admits(&v("1.0.0")));
}

#[test]
fn caret_constraints_of_different_majors_are_disjoint() {
    let one = c("^1.0");
    let two = c("^2.0");
    assert!(one.intersect(&two).is_none());
    assert!(!one.overlaps(&two));
}

#[test]
fn intersection_narrows_to_common_interval() {
    let both = c(">=1.2").intersect(&c("^1.0"));
    assert!(both.admits(&v("1.4.0")));
    assert!(!both.admits(&v("1.1.0")));
    assert!(!both.admits(&v("2.0.0")));
    assert_eq!(both.to_string(), ">=1.2.0, <2.0.0");
}

#[test]
fn intersection_with_any_is_identity() {
    let range = c("~1.4");
    assert_eq!(Constraint::Any.intersect(&range), range);
    assert_eq!(range.intersect(&Constraint::Any), range);
}

#[test]
fn branch_and_range_never_overlap() {
    assert!(c("branch:main").intersect(&c("^1.0")).is_none());
}

#[test]
fn exact_constraint_round_trips_through_admits() {
    let version = v("1.2.3");
    assert!(Constraint::exact(&version).admits(&version));
    assert!(!Constraint::exact(&version).admits(&v("1.2.4")));
}

#[test]
fn version_ordering_puts_branches_after_releases() {
    let mut versions = vec![Version::branch("main"), v("2.0.0"), v("1.0.0-rc.1"), v("1.0.0")];
    versions.sort();
    assert_eq!(
        versions,
        vec![v("1.0.0-rc.1"), v("1.0.0"), v("2.0.0"), Version::branch("main")]
    );
}

#[test]
fn version_parse_accepts_leading_v() {
    assert_eq!(v("v1.2.3"), Version::semver(1, 2, 3));
    assert!("nope".parse::<Version>().is_err());
}

#[test]
fn unstable_versions() {
    assert!(v("1.0.0-beta").is_unstable());
    assert!(Version::branch("main").is_unstable());
    assert!(!v("1.0.0").is_unstable());
}

#[test]
fn prerelease_pins_are_detected() {
    assert!(c(">=1.0.0-beta").pins_unstable());
    assert!(c("branch:main").pins_unstable());
    assert!(!c("^1.0").pins_unstable());
}
