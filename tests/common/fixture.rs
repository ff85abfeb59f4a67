use assert_fs::TempDir;
use bitlist::artifacts::objects::object_id::ObjectId;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const REGULAR: &str = "100644";
pub const EXECUTABLE: &str = "100755";
pub const SYMLINK: &str = "120000";
pub const SUBMODULE: &str = "160000";
pub const DIRECTORY: &str = "40000";

/// First commit time of every fixture; later commits are a minute apart
pub const EPOCH: i64 = 1_700_000_000;

pub fn hash_object(kind: &str, payload: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(format!("{kind} {}\0", payload.len()).as_bytes());
    hasher.update(payload);
    ObjectId::from_raw(hasher.finalize().into())
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("failed to compress");
    encoder.finish().expect("failed to compress")
}

/// Something to put in a tree: file content or a prepared entry
#[derive(Debug, Clone)]
pub enum FileSpec {
    File(String),
    Executable(String),
    Symlink(String),
    Submodule(ObjectId),
}

impl From<&str> for FileSpec {
    fn from(content: &str) -> Self {
        FileSpec::File(content.to_string())
    }
}

/// Builds repositories on disk object by object, the way git lays them out
pub struct RepoBuilder {
    dir: TempDir,
    git_dir: PathBuf,
    clock: i64,
}

impl RepoBuilder {
    /// Work tree with a `.git` directory; HEAD points at `main`
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let git_dir = dir.path().join(".git");
        Self::init(dir, git_dir)
    }

    pub fn bare() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let git_dir = dir.path().to_path_buf();
        Self::init(dir, git_dir)
    }

    fn init(dir: TempDir, git_dir: PathBuf) -> Self {
        for sub in ["objects/pack", "refs/heads", "refs/tags"] {
            std::fs::create_dir_all(git_dir.join(sub)).expect("failed to create git dir");
        }
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").expect("failed to write HEAD");

        RepoBuilder {
            dir,
            git_dir,
            clock: EPOCH,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.git_dir.join("objects")
    }

    pub fn write_object(&self, kind: &str, payload: &[u8]) -> ObjectId {
        let oid = hash_object(kind, payload);
        let path = self.objects_dir().join(oid.to_path());
        std::fs::create_dir_all(path.parent().expect("loose path has a parent"))
            .expect("failed to create fan-out dir");

        let mut raw = format!("{kind} {}\0", payload.len()).into_bytes();
        raw.extend_from_slice(payload);
        std::fs::write(path, zlib(&raw)).expect("failed to write object");
        oid
    }

    /// Store `header` and `payload` under `oid` verbatim, whatever the header claims
    pub fn write_loose_bytes(&self, oid: &ObjectId, header: &str, payload: &[u8]) {
        let path = self.objects_dir().join(oid.to_path());
        std::fs::create_dir_all(path.parent().expect("loose path has a parent"))
            .expect("failed to create fan-out dir");

        let mut raw = header.as_bytes().to_vec();
        raw.extend_from_slice(payload);
        std::fs::write(path, zlib(&raw)).expect("failed to write object");
    }

    /// Remove a loose object, e.g. after packing it
    pub fn delete_object(&self, oid: &ObjectId) {
        std::fs::remove_file(self.objects_dir().join(oid.to_path())).expect("failed to delete");
    }

    pub fn blob(&self, content: &[u8]) -> ObjectId {
        self.write_object("blob", content)
    }

    /// Tree from `(mode, name, oid)` entries, in any order
    pub fn tree(&self, entries: &[(&str, &str, ObjectId)]) -> ObjectId {
        let mut entries = entries.to_vec();
        entries.sort_by_key(|(mode, name, _)| {
            let mut key = name.as_bytes().to_vec();
            if *mode == DIRECTORY {
                key.push(b'/');
            }
            key
        });

        let mut payload = Vec::new();
        for (mode, name, oid) in entries {
            payload.extend_from_slice(format!("{mode} {name}\0").as_bytes());
            payload.extend_from_slice(oid.as_bytes());
        }
        self.write_object("tree", &payload)
    }

    /// Nested trees from `path -> content` pairs
    pub fn tree_from_files<F: Into<FileSpec> + Clone>(&self, files: &[(&str, F)]) -> ObjectId {
        let specs = files
            .iter()
            .map(|(path, spec)| (path.to_string(), spec.clone().into()))
            .collect::<Vec<(String, FileSpec)>>();
        self.build_tree(&specs)
    }

    fn build_tree(&self, files: &[(String, FileSpec)]) -> ObjectId {
        let mut children: BTreeMap<String, Vec<(String, FileSpec)>> = BTreeMap::new();
        let mut entries: Vec<(&str, String, ObjectId)> = Vec::new();

        for (path, spec) in files {
            match path.split_once('/') {
                Some((dir, rest)) => children
                    .entry(dir.to_string())
                    .or_default()
                    .push((rest.to_string(), spec.clone())),
                None => {
                    let (mode, oid) = match spec {
                        FileSpec::File(content) => (REGULAR, self.blob(content.as_bytes())),
                        FileSpec::Executable(content) => (EXECUTABLE, self.blob(content.as_bytes())),
                        FileSpec::Symlink(target) => (SYMLINK, self.blob(target.as_bytes())),
                        FileSpec::Submodule(commit) => (SUBMODULE, *commit),
                    };
                    entries.push((mode, path.clone(), oid));
                }
            }
        }
        for (dir, files) in children {
            let oid = self.build_tree(&files);
            entries.push((DIRECTORY, dir, oid));
        }

        let borrowed = entries
            .iter()
            .map(|(mode, name, oid)| (*mode, name.as_str(), *oid))
            .collect::<Vec<_>>();
        self.tree(&borrowed)
    }

    /// Advance the fixture clock and return the new time
    pub fn tick(&mut self) -> i64 {
        self.clock += 60;
        self.clock
    }

    pub fn commit_at(
        &self,
        tree: ObjectId,
        parents: &[ObjectId],
        message: &str,
        author: &str,
        time: i64,
    ) -> ObjectId {
        let mut payload = format!("tree {tree}\n");
        for parent in parents {
            payload.push_str(&format!("parent {parent}\n"));
        }
        payload.push_str(&format!("author {author} {time} +0000\n"));
        payload.push_str(&format!("committer {author} {time} +0000\n"));
        payload.push_str(&format!("\n{message}\n"));
        self.write_object("commit", payload.as_bytes())
    }

    pub fn commit(&mut self, tree: ObjectId, parents: &[ObjectId], message: &str) -> ObjectId {
        let time = self.tick();
        self.commit_at(tree, parents, message, "Jane Doe <jane@example.com>", time)
    }

    pub fn commit_files<F: Into<FileSpec> + Clone>(
        &mut self,
        files: &[(&str, F)],
        parents: &[ObjectId],
        message: &str,
    ) -> ObjectId {
        let tree = self.tree_from_files(files);
        self.commit(tree, parents, message)
    }

    /// Annotated tag object plus its ref
    pub fn annotated_tag(&mut self, name: &str, target: ObjectId, message: &str) -> ObjectId {
        let time = self.tick();
        let payload = format!(
            "object {target}\ntype commit\ntag {name}\ntagger Jane Doe <jane@example.com> {time} +0000\n\n{message}\n"
        );
        let oid = self.write_object("tag", payload.as_bytes());
        self.set_ref(&format!("refs/tags/{name}"), oid);
        oid
    }

    /// Loose ref, e.g. `refs/heads/main`
    pub fn set_ref(&self, name: &str, oid: ObjectId) {
        let path = self.git_dir.join(name);
        std::fs::create_dir_all(path.parent().expect("ref path has a parent"))
            .expect("failed to create ref dir");
        std::fs::write(path, format!("{oid}\n")).expect("failed to write ref");
    }

    pub fn set_branch(&self, name: &str, oid: ObjectId) {
        self.set_ref(&format!("refs/heads/{name}"), oid);
    }

    pub fn set_packed_refs(&self, refs: &[(&str, ObjectId)]) {
        let mut content = String::from("# pack-refs with: peeled fully-peeled sorted \n");
        let mut refs = refs.to_vec();
        refs.sort_by_key(|(name, _)| name.to_string());
        for (name, oid) in refs {
            content.push_str(&format!("{oid} {name}\n"));
        }
        std::fs::write(self.git_dir.join("packed-refs"), content).expect("failed to write packed-refs");
    }

    pub fn set_head(&self, content: &str) {
        std::fs::write(self.git_dir.join("HEAD"), content).expect("failed to write HEAD");
    }
}

impl Default for RepoBuilder {
    fn default() -> Self {
        Self::new()
    }
}
