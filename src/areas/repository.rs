//! The shareable repository handle
//!
//! A `Repository` owns the object database and ref store of one on-disk
//! repository and exposes the read operations of the engine. Nothing in it is
//! mutated after opening except lazily initialised pack tables, so one handle
//! can serve concurrent walks, diffs and blames.

use crate::areas::database::Database;
use crate::areas::refs::{Head, Reference, Refs};
use crate::artifacts::archive::{self, ArchiveFormat};
use crate::artifacts::blame::{self, BlameHunk, BlameLine};
use crate::artifacts::branch::commitish;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::core::AbortSignal;
use crate::artifacts::diff::FilePatch;
use crate::artifacts::diff::blob_diff::{self, BlobDiff};
use crate::artifacts::diff::tree_diff::{self, DiffOptions, FileDiff};
use crate::artifacts::log::rev_list::{HistoryQuery, RevList};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::artifacts::search::{self, TreeMatch};
use crate::artifacts::stats::{self, RepositoryStats};
use crate::artifacts::tree::blob_stream::BlobStream;
use crate::artifacts::tree::resolver::{self, TreeItem, TreeWalker};
use crate::config::EngineSettings;
use crate::errors::{Error, IoResultExt, Result};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Placeholder text git writes into `description` on `init`
const DEFAULT_DESCRIPTION_PREFIX: &str = "Unnamed repository;";

pub struct Repository {
    path: PathBuf,
    git_dir: PathBuf,
    settings: EngineSettings,
    database: Database,
    refs: Refs,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("git_dir", &self.git_dir)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, EngineSettings::default())
    }

    /// Open a work tree (with a `.git` directory or `gitdir:` file) or a bare
    /// repository
    pub fn open_with(path: impl AsRef<Path>, settings: EngineSettings) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::RepositoryNotFound(path.to_path_buf()));
        }
        let path = path.canonicalize().with_path(path)?;
        let git_dir = Self::find_git_dir(&path)?;

        tracing::debug!(path = %path.display(), git_dir = %git_dir.display(), "opened repository");
        Ok(Repository {
            database: Database::new(git_dir.join("objects"), settings.max_delta_depth),
            refs: Refs::new(git_dir.clone()),
            path,
            git_dir,
            settings,
            writer: Mutex::new(Box::new(io::stdout())),
        })
    }

    fn find_git_dir(path: &Path) -> Result<PathBuf> {
        let dot_git = path.join(".git");

        if dot_git.is_dir() && Self::is_git_dir(&dot_git) {
            return Ok(dot_git);
        }

        if dot_git.is_file() {
            let content = std::fs::read_to_string(&dot_git).with_path(&dot_git)?;
            let target = content
                .trim()
                .strip_prefix("gitdir:")
                .map(str::trim)
                .ok_or_else(|| Error::NotAGitRepository(path.to_path_buf()))?;
            let target = path.join(target);

            return if Self::is_git_dir(&target) {
                Ok(target)
            } else {
                Err(Error::NotAGitRepository(path.to_path_buf()))
            };
        }

        if Self::is_git_dir(path) {
            return Ok(path.to_path_buf());
        }

        Err(Error::NotAGitRepository(path.to_path_buf()))
    }

    fn is_git_dir(dir: &Path) -> bool {
        dir.join("objects").is_dir() && dir.join("refs").is_dir() && dir.join("HEAD").is_file()
    }

    /// Send command output somewhere other than stdout
    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.writer = Mutex::new(writer);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Directory name without a trailing `.git`
    pub fn name(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        name.strip_suffix(".git").map(str::to_string).unwrap_or(name)
    }

    pub fn writer(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Content of the `description` file, unless it is git's placeholder
    pub fn description(&self) -> Result<Option<String>> {
        let path = self.git_dir.join("description");
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_path(path),
        };
        let content = content.trim();

        if content.is_empty() || content.starts_with(DEFAULT_DESCRIPTION_PREFIX) {
            Ok(None)
        } else {
            Ok(Some(content.to_string()))
        }
    }

    /// Short name of the branch HEAD points at; `None` when HEAD is detached
    pub fn default_branch(&self) -> Result<Option<String>> {
        match self.refs.head()? {
            Head::Branch(name) if name.is_branch() => Ok(Some(name.short_name().to_string())),
            Head::Branch(_) | Head::Detached(_) => Ok(None),
        }
    }

    /// Resolve a revision expression to a commit
    pub fn resolve(&self, revision: &str) -> Result<ObjectId> {
        let oid = Revision::try_parse(revision)?.resolve(self)?;
        tracing::debug!(%revision, %oid, "resolved revision");
        Ok(oid)
    }

    /// Resolve a revision expression to whatever object it names, tags included
    pub fn resolve_object(&self, revision: &str) -> Result<ObjectId> {
        Revision::try_parse(revision)?.resolve_object(self)
    }

    pub fn split_commitish_path(&self, combined: &str) -> Result<(String, String)> {
        commitish::split_commitish_path(self, combined)
    }

    pub fn list_branches(&self) -> Result<Vec<Reference>> {
        self.refs.list_branches()
    }

    pub fn list_tags(&self) -> Result<Vec<Reference>> {
        self.refs.list_tags()
    }

    pub fn walk_history(&self, start: ObjectId, query: HistoryQuery) -> Result<RevList<'_>> {
        RevList::new(&self.database, start, query)
    }

    /// Number of commits a walk from `start` yields; visits the whole history
    pub fn count_history(
        &self,
        start: ObjectId,
        path: Option<&str>,
        abort: Option<&AbortSignal>,
    ) -> Result<usize> {
        let query = HistoryQuery {
            path: path.filter(|path| !path.is_empty()).map(str::to_string),
            abort: abort.cloned(),
            ..HistoryQuery::default()
        };

        RevList::new(&self.database, start, query)?.total()
    }

    /// Commits whose message contains `text`, ignoring case
    pub fn search_commits(
        &self,
        start: ObjectId,
        text: &str,
        path: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> Result<RevList<'_>> {
        let mut query = HistoryQuery::default().with_message(text).page(skip, limit);
        if let Some(path) = path {
            query = query.with_path(path);
        }

        RevList::new(&self.database, start, query)
    }

    /// Root tree id of a commit
    pub fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId> {
        Ok(*self.database.parse_object_as_commit(commit)?.tree_oid())
    }

    pub fn resolve_tree(&self, commit: &ObjectId) -> Result<Tree> {
        let tree_oid = self.commit_tree(commit)?;
        resolver::load_tree(&self.database, &tree_oid, commit)
    }

    pub fn resolve_path(&self, tree: &ObjectId, path: &str) -> Result<TreeEntry> {
        resolver::resolve_path(&self.database, tree, path)
    }

    pub fn list_directory(&self, tree: &ObjectId) -> Result<Vec<TreeEntry>> {
        resolver::list_directory(&self.database, tree)
    }

    /// Stream the content of a file entry
    pub fn read_blob(&self, entry: &TreeEntry) -> Result<BlobStream> {
        if !entry.mode.is_blob() {
            return Err(Error::PathNotFound(entry.name().into_owned()));
        }

        let reader = self.database.open_reader(&entry.oid)?;
        if reader.object_type != ObjectType::Blob {
            return Err(Error::corrupt(
                entry.oid,
                format!("expected blob, found {}", reader.object_type),
            ));
        }

        Ok(BlobStream::new(reader))
    }

    /// Every file, symlink and submodule below `tree`, with full paths
    pub fn traverse_tree(
        &self,
        tree: ObjectId,
    ) -> Result<impl Iterator<Item = Result<TreeItem>> + '_> {
        Ok(TreeWalker::new(&self.database, tree)?.files())
    }

    pub fn find_readme(&self, tree: &ObjectId) -> Result<Option<TreeEntry>> {
        resolver::find_readme(&self.database, tree)
    }

    /// Diff options seeded from the engine settings
    pub fn diff_options(&self, paths: &[String]) -> DiffOptions {
        DiffOptions {
            paths: paths.to_vec(),
            rename_threshold: self.settings.rename_threshold,
            rename_limit: self.settings.rename_limit,
            ..DiffOptions::default()
        }
    }

    pub fn diff_trees(
        &self,
        old_tree: Option<&ObjectId>,
        new_tree: Option<&ObjectId>,
        options: &DiffOptions,
    ) -> Result<Vec<FileDiff>> {
        tree_diff::diff_trees(&self.database, old_tree, new_tree, options)
    }

    pub fn diff_blobs(&self, old: &[u8], new: &[u8]) -> BlobDiff {
        blob_diff::diff_blobs(
            old,
            new,
            self.settings.context_lines,
            self.settings.binary_sniff_len,
        )
    }

    /// Changes a commit introduced relative to its first parent, with patches
    ///
    /// A root commit is compared with the empty tree.
    pub fn diff_commit(&self, commit: &ObjectId, options: &DiffOptions) -> Result<Vec<FilePatch>> {
        let parsed = self.database.parse_object_as_commit(commit)?;
        let parent_tree = parsed
            .parent()
            .map(|parent| {
                self.commit_tree(parent)
                    .map_err(|e| e.referenced_by(commit))
            })
            .transpose()?;

        self.diff_trees(parent_tree.as_ref(), Some(parsed.tree_oid()), options)?
            .into_iter()
            .map(|diff| {
                let content = self.diff_entries(diff.old.as_ref(), diff.new.as_ref())?;
                Ok(FilePatch { diff, content })
            })
            .collect()
    }

    /// Content diff between two versions of a file; either side may be absent
    pub fn diff_entries(&self, old: Option<&TreeEntry>, new: Option<&TreeEntry>) -> Result<BlobDiff> {
        let old = self.entry_content(old)?;
        let new = self.entry_content(new)?;

        Ok(self.diff_blobs(&old, &new))
    }

    fn entry_content(&self, entry: Option<&TreeEntry>) -> Result<Vec<u8>> {
        match entry {
            None => Ok(Vec::new()),
            Some(entry) if entry.mode == EntryMode::Submodule => {
                Ok(format!("Subproject commit {}\n", entry.oid).into_bytes())
            }
            Some(entry) => Ok(self
                .database
                .parse_object_as_blob(&entry.oid)?
                .into_content()
                .to_vec()),
        }
    }

    pub fn blame(
        &self,
        commit: ObjectId,
        path: &str,
        abort: Option<&AbortSignal>,
    ) -> Result<Vec<BlameLine>> {
        blame::blame(&self.database, commit, path, abort)
    }

    pub fn blame_hunks(
        &self,
        commit: ObjectId,
        path: &str,
        abort: Option<&AbortSignal>,
    ) -> Result<Vec<BlameHunk>> {
        Ok(blame::blame_hunks(&self.blame(commit, path, abort)?))
    }

    /// Serialise the tree of `commit` as a zip or tar archive
    pub fn archive_tree(
        &self,
        commit: ObjectId,
        format: ArchiveFormat,
        prefix: Option<&str>,
    ) -> Result<Vec<u8>> {
        let cursor = archive::write_archive(
            &self.database,
            commit,
            format,
            prefix,
            Cursor::new(Vec::new()),
        )?;

        Ok(cursor.into_inner())
    }

    pub fn stats(&self, commit: ObjectId, abort: Option<&AbortSignal>) -> Result<RepositoryStats> {
        stats::collect_stats(&self.database, commit, abort)
    }

    pub fn search_tree(
        &self,
        commit: ObjectId,
        pattern: &str,
        abort: Option<&AbortSignal>,
    ) -> Result<Vec<TreeMatch>> {
        let tree_oid = self.commit_tree(&commit)?;
        search::search_tree(
            &self.database,
            tree_oid,
            pattern,
            self.settings.binary_sniff_len,
            abort,
        )
    }
}
