use bitlist::areas::refs::Reference;
use bitlist::artifacts::objects::object_id::ObjectId;
use bitlist::errors::Error;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

mod common;
use common::fixture::RepoBuilder;

/// `main` with three linear commits, a `feature` branch merged back in and
/// tags on the first commit
///
/// ```text
/// first - second - merge   (main)
///       \        /
///         topic            (feature)
/// ```
struct History {
    repo: RepoBuilder,
    first: ObjectId,
    second: ObjectId,
    topic: ObjectId,
    merge: ObjectId,
    annotated: ObjectId,
}

#[fixture]
fn history() -> History {
    let mut repo = RepoBuilder::new();
    let first = repo.commit_files(&[("src/app.go", "package main\n")], &[], "first");
    let second = repo.commit_files(
        &[("src/app.go", "package main\n\nfunc main() {}\n")],
        &[first],
        "second",
    );
    let topic = repo.commit_files(
        &[("src/app.go", "package main\n"), ("docs/guide.md", "# Guide\n")],
        &[first],
        "topic",
    );
    let merged = repo.tree_from_files(&[
        ("src/app.go", "package main\n\nfunc main() {}\n"),
        ("docs/guide.md", "# Guide\n"),
    ]);
    let merge = repo.commit(merged, &[second, topic], "Merge branch 'feature'");

    repo.set_branch("main", merge);
    repo.set_branch("feature", topic);
    repo.set_ref("refs/tags/lightweight", first);
    let annotated = repo.annotated_tag("v1.0", first, "first release");

    History {
        repo,
        first,
        second,
        topic,
        merge,
        annotated,
    }
}

#[rstest]
#[case::branch("main", |h: &History| h.merge)]
#[case::head("HEAD", |h: &History| h.merge)]
#[case::at_alias("@", |h: &History| h.merge)]
#[case::first_parent("main^", |h: &History| h.second)]
#[case::second_parent("main^2", |h: &History| h.topic)]
#[case::parent_zero("main^0", |h: &History| h.merge)]
#[case::ancestor("main~2", |h: &History| h.first)]
#[case::chained("main^2~1", |h: &History| h.first)]
#[case::full_ref("refs/heads/feature", |h: &History| h.topic)]
#[case::lightweight_tag("lightweight", |h: &History| h.first)]
#[case::annotated_tag_is_peeled("v1.0", |h: &History| h.first)]
fn revisions_resolve_to_commits(
    history: History,
    #[case] revision: &str,
    #[case] expected: fn(&History) -> ObjectId,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(history.repo.path());

    assert_eq!(repository.resolve(revision)?, expected(&history));
    Ok(())
}

#[rstest]
fn full_and_abbreviated_ids_resolve(history: History) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(history.repo.path());

    assert_eq!(repository.resolve(&history.second.to_hex())?, history.second);
    assert_eq!(repository.resolve(&history.second.to_short_oid())?, history.second);
    Ok(())
}

#[rstest]
fn resolve_object_keeps_the_tag(history: History) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(history.repo.path());

    assert_eq!(repository.resolve_object("v1.0")?, history.annotated);
    Ok(())
}

#[rstest]
#[case::unknown_branch("nope")]
#[case::missing_parent("main~10")]
#[case::missing_second_parent("feature^2")]
fn unresolvable_revisions_are_not_found(history: History, #[case] revision: &str) {
    let repository = common::open(history.repo.path());

    let result = repository.resolve(revision);

    assert!(
        matches!(result, Err(Error::RevisionNotFound(_))),
        "{revision} gave {result:?}"
    );
}

/// Store two blobs whose ids share their first four hex digits; returns that prefix
fn write_colliding_blobs(repo: &RepoBuilder) -> String {
    let mut seen = std::collections::HashMap::new();
    let (prefix, pair) = (0u32..)
        .find_map(|n| {
            let oid = common::fixture::hash_object("blob", n.to_string().as_bytes());
            let prefix = oid.to_hex()[..4].to_string();
            seen.insert(prefix.clone(), n)
                .map(|previous| (prefix, (previous, n)))
        })
        .expect("a collision exists among 65537 ids");
    repo.blob(pair.0.to_string().as_bytes());
    repo.blob(pair.1.to_string().as_bytes());
    prefix
}

#[test]
fn ambiguous_prefix_lists_candidates() -> Result<(), Box<dyn std::error::Error>> {
    let repo = RepoBuilder::new();
    let prefix = write_colliding_blobs(&repo);
    let repository = common::open(repo.path());

    let result = repository.resolve(&prefix);

    let Err(Error::AmbiguousRevision { candidates, .. }) = result else {
        panic!("expected an ambiguous revision, got {result:?}");
    };
    assert_eq!(candidates.len(), 2);
    Ok(())
}

#[test]
fn tag_of_a_tree_does_not_resolve_to_a_commit() {
    let mut repo = RepoBuilder::new();
    let tree = repo.tree_from_files(&[("a.txt", "a\n")]);
    let commit = repo.commit(tree, &[], "first");
    repo.set_branch("main", commit);
    repo.set_ref("refs/tags/tree-tag", tree);
    let repository = common::open(repo.path());

    let result = repository.resolve("tree-tag");

    assert!(matches!(result, Err(Error::RevisionNotFound(_))));
}

#[rstest]
fn branches_and_tags_are_listed_by_name(
    history: History,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(history.repo.path());

    assert_eq!(
        repository.list_branches()?,
        vec![
            Reference::new("feature".into(), history.topic),
            Reference::new("main".into(), history.merge),
        ]
    );
    assert_eq!(
        repository.list_tags()?,
        vec![
            Reference::new("lightweight".into(), history.first),
            Reference::new("v1.0".into(), history.annotated),
        ]
    );
    Ok(())
}

#[test]
fn packed_refs_are_merged_with_loose_refs() -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = RepoBuilder::new();
    let old = repo.commit_files(&[("a.txt", "a\n")], &[], "old");
    let new = repo.commit_files(&[("a.txt", "b\n")], &[old], "new");
    repo.set_packed_refs(&[
        ("refs/heads/main", old),
        ("refs/heads/release/1.x", old),
        ("refs/tags/v0.1", old),
    ]);
    repo.set_branch("main", new);
    let repository = common::open(repo.path());

    assert_eq!(repository.resolve("main")?, new);
    assert_eq!(repository.resolve("release/1.x")?, old);
    let names = repository
        .list_branches()?
        .into_iter()
        .map(|branch| branch.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["main", "release/1.x"]);
    Ok(())
}

#[rstest]
#[case::only_main(&[], "main/src/app.go", ("main", "src/app.go"))]
#[case::longest_ref_wins(&["main/src"], "main/src/app.go", ("main/src", "app.go"))]
#[case::bare_revision(&[], "main", ("main", ""))]
#[case::default_branch_fallback(&[], "src/app.go", ("main", "src/app.go"))]
#[case::slashes_are_normalised(&[], "/main//src/", ("main", "src"))]
fn commitish_paths_are_split(
    #[case] extra_branches: &[&str],
    #[case] combined: &str,
    #[case] expected: (&str, &str),
) -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = RepoBuilder::new();
    let commit = repo.commit_files(&[("src/app.go", "package main\n")], &[], "first");
    let mut packed = vec![("refs/heads/main".to_string(), commit)];
    for branch in extra_branches {
        packed.push((format!("refs/heads/{branch}"), commit));
    }
    repo.set_packed_refs(
        &packed
            .iter()
            .map(|(name, oid)| (name.as_str(), *oid))
            .collect::<Vec<_>>(),
    );
    let repository = common::open(repo.path());

    let (revision, path) = repository.split_commitish_path(combined)?;

    assert_eq!((revision.as_str(), path.as_str()), expected);
    Ok(())
}

#[rstest]
fn unknown_commitish_is_invalid(history: History) {
    let repository = common::open(history.repo.path());

    let result = repository.split_commitish_path("nope/missing.txt");

    assert!(matches!(result, Err(Error::InvalidCommitish(_))));
}

#[test]
fn ambiguous_id_prefix_falls_back_to_a_path() -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = RepoBuilder::new();
    let prefix = write_colliding_blobs(&repo);
    let path = format!("{prefix}/notes.txt");
    let commit = repo.commit_files(&[(path.as_str(), "notes\n")], &[], "first");
    repo.set_branch("main", commit);
    let repository = common::open(repo.path());

    let (revision, rest) = repository.split_commitish_path(&path)?;

    assert_eq!((revision.as_str(), rest.as_str()), ("main", path.as_str()));
    Ok(())
}

#[test]
fn ambiguous_id_prefix_without_a_matching_path_stays_ambiguous() {
    let mut repo = RepoBuilder::new();
    let prefix = write_colliding_blobs(&repo);
    let commit = repo.commit_files(&[("README.md", "hi\n")], &[], "first");
    repo.set_branch("main", commit);
    let repository = common::open(repo.path());

    let result = repository.split_commitish_path(&format!("{prefix}/missing.txt"));

    assert!(matches!(result, Err(Error::AmbiguousRevision { .. })));
}
