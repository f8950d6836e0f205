//! Repositories built object by object, without a git binary
//!
//! Objects are written as zlib-compressed loose files under `objects/`; packs come
//! from [`crate::common::pack::PackBuilder`].

use assert_fs::TempDir;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use rstest::fixture;
use sha1::{Digest, Sha1};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const REGULAR: &str = "100644";
pub const EXECUTABLE: &str = "100755";
pub const SYMLINK: &str = "120000";
pub const GITLINK: &str = "160000";
pub const DIRECTORY: &str = "40000";

const EPOCH: u64 = 1_700_000_000;

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn from_hex(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("valid hex"))
        .collect()
}

/// Id of an object of `kind` holding `body`
pub fn object_id(kind: &str, body: &[u8]) -> String {
    to_hex(&Sha1::digest(loose_content(kind, body)))
}

fn loose_content(kind: &str, body: &[u8]) -> Vec<u8> {
    let mut content = format!("{kind} {}\0", body.len()).into_bytes();
    content.extend_from_slice(body);
    content
}

pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("zlib write");
    encoder.finish().expect("zlib finish")
}

/// Tree body with entries in git order (directories compare as `name/`)
pub fn tree_body(entries: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut entries = entries.to_vec();
    entries.sort_by_key(|(mode, name, _)| {
        if *mode == DIRECTORY {
            format!("{name}/")
        } else {
            name.to_string()
        }
    });

    let mut body = Vec::new();
    for (mode, name, oid) in entries {
        body.extend_from_slice(format!("{mode} {name}\0").as_bytes());
        body.extend_from_slice(&from_hex(oid));
    }
    body
}

pub fn commit_body(tree: &str, parents: &[&str], message: &str, timestamp: u64) -> Vec<u8> {
    let mut body = format!("tree {tree}\n");
    for parent in parents {
        body.push_str(&format!("parent {parent}\n"));
    }
    body.push_str(&format!(
        "author A U Thor <author@example.com> {timestamp} +0000\n"
    ));
    body.push_str(&format!(
        "committer C O Mitter <committer@example.com> {timestamp} +0000\n"
    ));
    body.push_str(&format!("\n{message}\n"));
    body.into_bytes()
}

pub struct TestRepo {
    dir: TempDir,
    git_dir: PathBuf,
    clock: Cell<u64>,
}

#[fixture]
pub fn repo() -> TestRepo {
    TestRepo::init()
}

impl TestRepo {
    /// Work tree layout: the repository lives in `<dir>/.git`
    pub fn init() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let git_dir = dir.path().join(".git");
        Self::create_layout(&git_dir);

        TestRepo {
            dir,
            git_dir,
            clock: Cell::new(EPOCH),
        }
    }

    pub fn init_bare() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let git_dir = dir.path().to_path_buf();
        Self::create_layout(&git_dir);

        TestRepo {
            dir,
            git_dir,
            clock: Cell::new(EPOCH),
        }
    }

    fn create_layout(git_dir: &Path) {
        std::fs::create_dir_all(git_dir.join("objects").join("pack")).expect("objects dir");
        std::fs::create_dir_all(git_dir.join("refs").join("heads")).expect("refs dir");
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/master\n").expect("HEAD");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn tick(&self) -> u64 {
        let now = self.clock.get() + 60;
        self.clock.set(now);
        now
    }

    pub fn object_path(&self, oid: &str) -> PathBuf {
        self.git_dir.join("objects").join(&oid[..2]).join(&oid[2..])
    }

    pub fn write_object(&self, kind: &str, body: &[u8]) -> String {
        let oid = object_id(kind, body);
        self.write_loose_at(&oid, kind, body);
        oid
    }

    /// Store `kind`/`body` under the file of `oid`, whatever `oid` hashes to
    pub fn write_loose_at(&self, oid: &str, kind: &str, body: &[u8]) {
        let path = self.object_path(oid);
        std::fs::create_dir_all(path.parent().expect("fan-out dir")).expect("fan-out dir");
        std::fs::write(path, compress(&loose_content(kind, body))).expect("loose object");
    }

    pub fn write_raw_object_file(&self, oid: &str, bytes: &[u8]) {
        let path = self.object_path(oid);
        std::fs::create_dir_all(path.parent().expect("fan-out dir")).expect("fan-out dir");
        std::fs::write(path, bytes).expect("raw object file");
    }

    pub fn remove_object(&self, oid: &str) {
        std::fs::remove_file(self.object_path(oid)).expect("remove loose object");
    }

    pub fn blob(&self, content: impl AsRef<[u8]>) -> String {
        self.write_object("blob", content.as_ref())
    }

    /// Tree of `(mode, name, oid)` entries
    pub fn tree(&self, entries: &[(&str, &str, &str)]) -> String {
        self.write_object("tree", &tree_body(entries))
    }

    pub fn commit(&self, tree: &str, parents: &[&str], message: &str) -> String {
        let timestamp = self.tick();
        self.write_object("commit", &commit_body(tree, parents, message, timestamp))
    }

    /// Nested trees for `(path, mode, oid)` entries; paths use `/`
    pub fn tree_of(&self, entries: &[(&str, &str, &str)]) -> String {
        let mut files = Vec::new();
        let mut dirs: BTreeMap<&str, Vec<(&str, &str, &str)>> = BTreeMap::new();

        for &(path, mode, oid) in entries {
            match path.split_once('/') {
                Some((dir, rest)) => dirs.entry(dir).or_default().push((rest, mode, oid)),
                None => files.push((mode.to_string(), path.to_string(), oid.to_string())),
            }
        }

        for (dir, children) in dirs {
            let oid = self.tree_of(&children);
            files.push((DIRECTORY.to_string(), dir.to_string(), oid));
        }

        let entries = files
            .iter()
            .map(|(mode, name, oid)| (mode.as_str(), name.as_str(), oid.as_str()))
            .collect::<Vec<_>>();
        self.tree(&entries)
    }

    /// Commit of regular files given as `(path, content)`
    pub fn commit_files(&self, files: &[(&str, &str)], parents: &[&str], message: &str) -> String {
        let blobs = files
            .iter()
            .map(|(path, content)| (*path, self.blob(content)))
            .collect::<Vec<_>>();
        let entries = blobs
            .iter()
            .map(|(path, oid)| (*path, REGULAR, oid.as_str()))
            .collect::<Vec<_>>();

        let tree = self.tree_of(&entries);
        self.commit(&tree, parents, message)
    }

    pub fn set_ref(&self, ref_name: &str, target: &str) {
        let path = self.git_dir.join(ref_name);
        std::fs::create_dir_all(path.parent().expect("ref dir")).expect("ref dir");
        std::fs::write(path, format!("{target}\n")).expect("ref file");
    }

    pub fn set_branch(&self, name: &str, oid: &str) {
        self.set_ref(&format!("refs/heads/{name}"), oid);
    }

    pub fn set_symbolic_ref(&self, ref_name: &str, target: &str) {
        self.set_ref(ref_name, &format!("ref: {target}"));
    }

    /// `packed-refs` listing `(ref name, oid)` pairs, with a peeled tag line
    pub fn write_packed_refs(&self, refs: &[(&str, &str)]) {
        let mut content = String::from("# pack-refs with: peeled fully-peeled sorted \n");
        for (name, oid) in refs {
            content.push_str(&format!("{oid} {name}\n"));
            if name.starts_with("refs/tags/") {
                content.push_str(&format!("^{oid}\n"));
            }
        }
        std::fs::write(self.git_dir.join("packed-refs"), content).expect("packed-refs");
    }
}
