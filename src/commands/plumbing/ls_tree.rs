use crate::areas::repository::Repository;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::TreeEntry;
use std::io::Write;

impl Repository {
    /// List the tree named by `commitish` (a commit or `revision/path` string)
    pub fn ls_tree(&self, commitish: &str, recursive: bool, long: bool) -> anyhow::Result<()> {
        let (revision, path) = self.split_commitish_path(commitish)?;
        let commit = self.resolve(&revision)?;
        let root = self.commit_tree(&commit)?;
        let entry = self.resolve_path(&root, &path)?;

        if !entry.is_tree() {
            self.print_tree_entry(&entry, &path, long)?;
            return Ok(());
        }

        if recursive {
            for item in self.traverse_tree(entry.oid)? {
                let item = item?;
                let full_path = join_path(&path, &item.path);
                let mut entry = item.entry;
                if long && entry.mode.is_blob() {
                    entry.size = Some(self.database().read_header(&entry.oid)?.1);
                }
                self.print_tree_entry(&entry, &full_path, long)?;
            }
        } else {
            for entry in self.list_directory(&entry.oid)? {
                self.print_tree_entry(&entry, &join_path(&path, &entry.name()), long)?;
            }
        }

        Ok(())
    }

    fn print_tree_entry(&self, entry: &TreeEntry, path: &str, long: bool) -> anyhow::Result<()> {
        if long {
            let size = match (entry.object_type(), entry.size) {
                (ObjectType::Blob, Some(size)) => size.to_string(),
                _ => "-".to_string(),
            };
            writeln!(
                self.writer(),
                "{} {} {} {:>7}\t{}",
                entry.mode.as_str(),
                entry.object_type(),
                entry.oid,
                size,
                path
            )?;
        } else {
            writeln!(
                self.writer(),
                "{} {} {}\t{}",
                entry.mode.as_str(),
                entry.object_type(),
                entry.oid,
                path
            )?;
        }

        Ok(())
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
