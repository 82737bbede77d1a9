use std::path::{Path, PathBuf};

use super::stem_loader;

/// One playable entry in the library: a directory that directly contains
/// at least one .wav. Thin directory-walk glue; the transport never sees
/// paths, only the node it's told to load.
#[derive(Clone, Debug)]
pub struct SongNode {
    pub name: String,
    pub path: PathBuf,
}

/// Walk `root` and collect playable directories in sorted order (root
/// itself included when it qualifies).
pub fn scan(root: &Path) -> Vec<SongNode> {
    let mut nodes = Vec::new();
    collect(root, root, &mut nodes);
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    nodes
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<SongNode>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut has_wav = false;
    let mut subdirs = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if stem_loader::is_wav(&path) {
            has_wav = true;
        }
    }
    if has_wav {
        let name = dir
            .strip_prefix(root)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| {
                dir.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| ".".into())
            });
        out.push(SongNode { name, path: dir.to_path_buf() });
    }
    for sub in subdirs {
        collect(root, &sub, out);
    }
}
