#![allow(dead_code)]

pub mod fixture;
pub mod pack;

use assert_cmd::Command;
use bitlist::areas::repository::Repository;
use bitlist::artifacts::log::rev_list::HistoryQuery;
use bitlist::artifacts::objects::object_id::ObjectId;
use std::path::Path;

pub fn open(path: &Path) -> Repository {
    Repository::open(path).expect("failed to open fixture repository")
}

/// Commit ids of a full walk from `start`
pub fn walk(repository: &Repository, start: ObjectId, query: HistoryQuery) -> Vec<ObjectId> {
    repository
        .walk_history(start, query)
        .expect("failed to start walk")
        .map(|node| node.expect("walk failed").oid)
        .collect()
}

pub fn run_bitlist(repository_dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("bitlist").expect("bitlist binary is built");
    cmd.arg("--repo")
        .arg(repository_dir)
        .args(args)
        .env("BITLIST_LOG", "off");
    cmd
}
