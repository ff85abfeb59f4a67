use bitlist::artifacts::objects::entry_mode::{EntryMode, FileMode};
use bitlist::artifacts::objects::object_id::ObjectId;
use bitlist::errors::Error;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

mod common;
use common::fixture::{FileSpec, RepoBuilder};
use common::pack::{PackInput, write_pack};

struct Project {
    repo: RepoBuilder,
    commit: ObjectId,
    submodule: ObjectId,
}

#[fixture]
fn project() -> Project {
    let mut repo = RepoBuilder::new();
    let submodule = common::fixture::hash_object("commit", b"not stored here");
    let tree = repo.tree_from_files(&[
        ("Readme.txt", FileSpec::from("Read me first.\n")),
        ("lib.rs", FileSpec::from("pub mod lib;\n")),
        ("lib/mod.rs", FileSpec::from("pub fn answer() -> u8 { 42 }\n")),
        ("lib/nested/deep.rs", FileSpec::from("// deep\n")),
        ("run.sh", FileSpec::Executable("#!/bin/sh\necho hi\n".into())),
        ("current", FileSpec::Symlink("lib/mod.rs".into())),
        ("vendor", FileSpec::Submodule(submodule)),
    ]);
    let commit = repo.commit(tree, &[], "Initial import");
    repo.set_branch("main", commit);

    Project {
        repo,
        commit,
        submodule,
    }
}

#[rstest]
fn directory_listing_is_canonical_with_sizes(
    project: Project,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(project.repo.path());
    let root = repository.commit_tree(&project.commit)?;

    let listing = repository
        .list_directory(&root)?
        .into_iter()
        .map(|entry| (entry.name().into_owned(), entry.mode, entry.size))
        .collect::<Vec<_>>();

    assert_eq!(
        listing,
        vec![
            ("Readme.txt".to_string(), EntryMode::File(FileMode::Regular), Some(15)),
            ("current".to_string(), EntryMode::Symlink, Some(10)),
            ("lib.rs".to_string(), EntryMode::File(FileMode::Regular), Some(13)),
            ("lib".to_string(), EntryMode::Directory, None),
            ("run.sh".to_string(), EntryMode::File(FileMode::Executable), Some(18)),
            ("vendor".to_string(), EntryMode::Submodule, None),
        ]
    );
    Ok(())
}

#[rstest]
fn resolve_tree_returns_the_root_tree(project: Project) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(project.repo.path());

    let tree = repository.resolve_tree(&project.commit)?;

    assert_eq!(tree.len(), 6);
    assert_eq!(
        tree.get("vendor").map(|entry| entry.oid),
        Some(project.submodule)
    );
    Ok(())
}

#[rstest]
#[case::file("lib/mod.rs", EntryMode::File(FileMode::Regular))]
#[case::nested("lib/nested/deep.rs", EntryMode::File(FileMode::Regular))]
#[case::directory("lib/nested", EntryMode::Directory)]
#[case::trailing_slash("lib/", EntryMode::Directory)]
#[case::root("", EntryMode::Directory)]
#[case::submodule("vendor", EntryMode::Submodule)]
fn paths_resolve_to_entries(
    project: Project,
    #[case] path: &str,
    #[case] mode: EntryMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(project.repo.path());
    let root = repository.commit_tree(&project.commit)?;

    let entry = repository.resolve_path(&root, path)?;

    assert_eq!(entry.mode, mode);
    Ok(())
}

#[rstest]
#[case::missing("nope.txt")]
#[case::through_a_file("lib.rs/anything")]
#[case::through_a_submodule("vendor/src/main.c")]
#[case::case_sensitive("readme.txt")]
fn unresolvable_paths_are_not_found(project: Project, #[case] path: &str) {
    let repository = common::open(project.repo.path());
    let root = repository
        .commit_tree(&project.commit)
        .expect("fixture commit has a tree");

    let result = repository.resolve_path(&root, path);

    assert!(matches!(result, Err(Error::PathNotFound(_))), "{path}: {result:?}");
}

#[rstest]
fn blob_is_streamed_in_chunks(project: Project) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(project.repo.path());
    let root = repository.commit_tree(&project.commit)?;
    let entry = repository.resolve_path(&root, "run.sh")?;

    let stream = repository.read_blob(&entry)?;
    assert_eq!(stream.size(), 18);
    let chunks = stream.chunks(8).collect::<Result<Vec<_>, _>>()?;

    assert_eq!(
        chunks.iter().map(|chunk| chunk.len()).collect::<Vec<_>>(),
        vec![8, 8, 2]
    );
    assert_eq!(chunks.concat(), b"#!/bin/sh\necho hi\n");
    Ok(())
}

#[rstest]
#[case::directory("lib")]
#[case::submodule("vendor")]
fn only_file_entries_have_content(project: Project, #[case] path: &str) {
    let repository = common::open(project.repo.path());
    let root = repository
        .commit_tree(&project.commit)
        .expect("fixture commit has a tree");
    let entry = repository
        .resolve_path(&root, path)
        .expect("fixture path exists");

    let result = repository.read_blob(&entry);

    assert!(matches!(result, Err(Error::PathNotFound(_))));
}

#[test]
fn packed_blob_streams_like_a_loose_one() -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = RepoBuilder::new();
    let content = "0123456789".repeat(1000);
    let blob = write_pack(
        &repo,
        "blobs",
        &[PackInput::Whole {
            kind: "blob",
            payload: content.clone().into_bytes(),
        }],
    )[0];
    let tree = repo.tree(&[(common::fixture::REGULAR, "digits.txt", blob)]);
    let commit = repo.commit(tree, &[], "digits");
    let repository = common::open(repo.path());

    let entry = repository.resolve_path(&repository.commit_tree(&commit)?, "digits.txt")?;
    let bytes = repository.read_blob(&entry)?.read_to_bytes()?;

    assert_eq!(bytes.len(), content.len());
    assert_eq!(bytes.as_ref(), content.as_bytes());
    Ok(())
}

#[rstest]
fn traversal_yields_every_file_with_full_paths(
    project: Project,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(project.repo.path());
    let root = repository.commit_tree(&project.commit)?;

    let paths = repository
        .traverse_tree(root)?
        .map(|item| item.map(|item| item.path))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(
        paths,
        vec![
            "Readme.txt",
            "current",
            "lib.rs",
            "lib/mod.rs",
            "lib/nested/deep.rs",
            "run.sh",
            "vendor",
        ]
    );
    Ok(())
}

#[rstest]
fn readme_is_found_ignoring_case(project: Project) -> Result<(), Box<dyn std::error::Error>> {
    let repository = common::open(project.repo.path());
    let root = repository.commit_tree(&project.commit)?;

    let readme = repository.find_readme(&root)?;

    assert_eq!(readme.map(|entry| entry.name().into_owned()), Some("Readme.txt".to_string()));
    Ok(())
}

#[test]
fn tree_without_readme_has_none() -> Result<(), Box<dyn std::error::Error>> {
    let repo = RepoBuilder::new();
    let tree = repo.tree_from_files(&[("main.c", "int main;\n"), ("readme/notes.txt", "x\n")]);
    let repository = common::open(repo.path());

    assert_eq!(repository.find_readme(&tree)?, None);
    Ok(())
}

#[test]
fn tree_pointing_at_a_missing_subtree_is_corrupt() {
    let mut repo = RepoBuilder::new();
    let subtree = repo.tree_from_files(&[("inner.txt", "x\n")]);
    let root = repo.tree(&[(common::fixture::DIRECTORY, "sub", subtree)]);
    let commit = repo.commit(root, &[], "broken");
    repo.delete_object(&subtree);
    let repository = common::open(repo.path());

    let result = repository.resolve_path(&root, "sub/inner.txt");

    assert!(matches!(result, Err(Error::CorruptRepository(_))));
    assert!(repository.resolve_tree(&commit).is_ok());
}

#[test]
fn entries_differing_only_in_invalid_utf8_stay_apart() -> Result<(), Box<dyn std::error::Error>> {
    let repo = RepoBuilder::new();
    let first = repo.blob(b"first\n");
    let second = repo.blob(b"second\n");
    let mut payload = Vec::new();
    for (name, oid) in [(&b"n\xfe"[..], first), (&b"n\xff"[..], second)] {
        payload.extend_from_slice(b"100644 ");
        payload.extend_from_slice(name);
        payload.push(0);
        payload.extend_from_slice(oid.as_bytes());
    }
    let tree = repo.write_object("tree", &payload);
    let repository = common::open(repo.path());

    let listing = repository
        .list_directory(&tree)?
        .into_iter()
        .map(|entry| (entry.name_bytes().to_vec(), entry.oid, entry.size))
        .collect::<Vec<_>>();

    assert_eq!(
        listing,
        vec![
            (b"n\xfe".to_vec(), first, Some(6)),
            (b"n\xff".to_vec(), second, Some(7)),
        ]
    );
    Ok(())
}
