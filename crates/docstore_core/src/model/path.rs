//! Derived path computation for folders and documents.
//!
//! # Responsibility
//! - Compute `/root/.../name` paths by walking folder parent ids.
//! - Detect parent cycles and bound walk depth instead of recursing forever.
//! - Answer placement questions (cycle, nesting depth) before a write.
//!
//! # Invariants
//! - Paths are recomputed on every access; nothing is cached across calls.
//! - A stored folder's depth (root = 1) never exceeds `MAX_FOLDER_DEPTH`, so
//!   every folder and document path stays derivable.
//! - A root folder `a` has path `/a`; an unfiled document `x` has path `/x`.

use super::folder::{Folder, FolderId};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound on folder nesting walked by path derivation.
pub const MAX_FOLDER_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The parent chain revisits `FolderId`.
    Cycle(FolderId),
    /// The chain is longer than `MAX_FOLDER_DEPTH`.
    TooDeep { max_depth: usize },
    /// A parent id points at no folder.
    MissingFolder(FolderId),
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cycle(id) => write!(f, "folder parent chain has a cycle at {id}"),
            Self::TooDeep { max_depth } => {
                write!(f, "folder nesting exceeds {max_depth} levels")
            }
            Self::MissingFolder(id) => write!(f, "folder not found in parent chain: {id}"),
        }
    }
}

impl Error for PathError {}

/// An entity paired with its derived path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    pub item: T,
    pub path: String,
}

impl<T> Located<T> {
    pub fn new(item: T, path: impl Into<String>) -> Self {
        Self {
            item,
            path: path.into(),
        }
    }
}

/// Resolves the path of a node called `name` whose parent folder is `parent`.
///
/// `lookup` returns `(name, parent)` for a folder id, or `None` when the id
/// is unknown. Lookup failures are propagated unchanged.
pub fn resolve_path<F, E>(name: &str, parent: Option<FolderId>, mut lookup: F) -> Result<String, E>
where
    F: FnMut(FolderId) -> Result<Option<(String, Option<FolderId>)>, E>,
    E: From<PathError>,
{
    let mut segments = vec![name.to_string()];
    let mut visited = HashSet::new();
    let mut cursor = parent;

    while let Some(current) = cursor {
        if !visited.insert(current) {
            return Err(PathError::Cycle(current).into());
        }
        if visited.len() > MAX_FOLDER_DEPTH {
            return Err(PathError::TooDeep {
                max_depth: MAX_FOLDER_DEPTH,
            }
            .into());
        }

        let (segment, next) = lookup(current)?.ok_or(PathError::MissingFolder(current))?;
        segments.push(segment);
        cursor = next;
    }

    let mut path = String::new();
    for segment in segments.iter().rev() {
        path.push('/');
        path.push_str(segment);
    }
    Ok(path)
}

#[derive(Debug, Clone)]
struct FolderNode {
    name: String,
    parent: Option<FolderId>,
}

/// Arena of folder names and parent links keyed by id.
///
/// Built once per request from the folder table so listing endpoints can
/// derive many paths without one query per ancestor.
#[derive(Debug, Clone, Default)]
pub struct FolderIndex {
    nodes: HashMap<FolderId, FolderNode>,
}

impl FolderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_folders<'a>(folders: impl IntoIterator<Item = &'a Folder>) -> Self {
        let mut index = Self::new();
        for folder in folders {
            index.insert(folder.id, folder.name.clone(), folder.parent);
        }
        index
    }

    pub fn insert(&mut self, id: FolderId, name: impl Into<String>, parent: Option<FolderId>) {
        self.nodes.insert(
            id,
            FolderNode {
                name: name.into(),
                parent,
            },
        );
    }

    pub fn contains(&self, id: FolderId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn folder_path(&self, id: FolderId) -> Result<String, PathError> {
        let node = self.nodes.get(&id).ok_or(PathError::MissingFolder(id))?;
        self.resolve(&node.name, node.parent)
    }

    pub fn document_path(&self, name: &str, folder: Option<FolderId>) -> Result<String, PathError> {
        self.resolve(name, folder)
    }

    /// Returns whether placing `folder` under `new_parent` would close a cycle.
    ///
    /// True when `new_parent` is `folder` itself or one of its descendants,
    /// or when the existing chain above `new_parent` already loops.
    pub fn would_create_cycle(
        &self,
        folder: FolderId,
        new_parent: FolderId,
    ) -> Result<bool, PathError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(new_parent);
        while let Some(current) = cursor {
            if current == folder || !visited.insert(current) {
                return Ok(true);
            }
            cursor = match self.nodes.get(&current) {
                Some(node) => node.parent,
                None => return Err(PathError::MissingFolder(current)),
            };
        }
        Ok(false)
    }

    /// Number of folders from the root down to `id`, inclusive.
    pub fn depth(&self, id: FolderId) -> Result<usize, PathError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !visited.insert(current) {
                return Err(PathError::Cycle(current));
            }
            if visited.len() > MAX_FOLDER_DEPTH {
                return Err(PathError::TooDeep {
                    max_depth: MAX_FOLDER_DEPTH,
                });
            }
            cursor = match self.nodes.get(&current) {
                Some(node) => node.parent,
                None => return Err(PathError::MissingFolder(current)),
            };
        }
        Ok(visited.len())
    }

    /// Levels of descendants below `id`; zero for a leaf.
    pub fn height(&self, id: FolderId) -> usize {
        let mut children: HashMap<FolderId, Vec<FolderId>> = HashMap::new();
        for (child, node) in &self.nodes {
            if let Some(parent) = node.parent {
                children.entry(parent).or_default().push(*child);
            }
        }

        let mut visited = HashSet::from([id]);
        let mut level = vec![id];
        let mut height = 0;
        loop {
            let next: Vec<FolderId> = level
                .iter()
                .filter_map(|parent| children.get(parent))
                .flatten()
                .copied()
                .filter(|child| visited.insert(*child))
                .collect();
            if next.is_empty() {
                return height;
            }
            height += 1;
            level = next;
        }
    }

    /// Returns whether `folder` (a new leaf when `None`) and its subtree can
    /// sit under `parent` without exceeding `MAX_FOLDER_DEPTH`.
    pub fn fits_under(
        &self,
        parent: FolderId,
        folder: Option<FolderId>,
    ) -> Result<bool, PathError> {
        let above = match self.depth(parent) {
            Ok(depth) => depth,
            Err(PathError::TooDeep { .. }) => return Ok(false),
            Err(err) => return Err(err),
        };
        let below = folder.map_or(0, |id| self.height(id));
        Ok(above + 1 + below <= MAX_FOLDER_DEPTH)
    }

    /// Returns the first folder nested deeper than `MAX_FOLDER_DEPTH`, if any.
    pub fn find_too_deep(&self) -> Option<FolderId> {
        let mut ids: Vec<&FolderId> = self.nodes.keys().collect();
        ids.sort();
        ids.into_iter()
            .find(|id| matches!(self.depth(**id), Err(PathError::TooDeep { .. })))
            .copied()
    }

    /// Returns the first folder whose parent chain loops, if any.
    pub fn find_cycle(&self) -> Option<FolderId> {
        let mut ids: Vec<&FolderId> = self.nodes.keys().collect();
        ids.sort();
        ids.into_iter().find_map(|id| match self.folder_path(*id) {
            Err(PathError::Cycle(at)) => Some(at),
            _ => None,
        })
    }

    fn resolve(&self, name: &str, parent: Option<FolderId>) -> Result<String, PathError> {
        resolve_path(name, parent, |id| {
            Ok::<_, PathError>(
                self.nodes
                    .get(&id)
                    .map(|node| (node.name.clone(), node.parent)),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_path, FolderIndex, PathError, MAX_FOLDER_DEPTH};
    use uuid::Uuid;

    #[test]
    fn resolve_path_without_parent_is_rooted_name() {
        let path = resolve_path("x", None, |_| Ok::<_, PathError>(None)).unwrap();
        assert_eq!(path, "/x");
    }

    #[test]
    fn resolve_path_propagates_lookup_errors() {
        #[derive(Debug, PartialEq)]
        enum LookupError {
            Offline,
            Path(PathError),
        }
        impl From<PathError> for LookupError {
            fn from(value: PathError) -> Self {
                Self::Path(value)
            }
        }

        let err = resolve_path("x", Some(Uuid::new_v4()), |_| Err(LookupError::Offline))
            .unwrap_err();
        assert_eq!(err, LookupError::Offline);
    }

    #[test]
    fn depth_bound_stops_long_chains() {
        let mut index = FolderIndex::new();
        let ids: Vec<Uuid> = (0..=MAX_FOLDER_DEPTH + 1).map(|_| Uuid::new_v4()).collect();
        for (position, id) in ids.iter().enumerate() {
            let parent = position.checked_sub(1).map(|prev| ids[prev]);
            index.insert(*id, "n", parent);
        }

        let leaf = *ids.last().unwrap();
        assert_eq!(
            index.folder_path(leaf).unwrap_err(),
            PathError::TooDeep {
                max_depth: MAX_FOLDER_DEPTH
            }
        );
        assert!(index.find_too_deep().is_some());
    }

    fn chain(index: &mut FolderIndex, len: usize, root_parent: Option<Uuid>) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(len);
        let mut parent = root_parent;
        for _ in 0..len {
            let id = Uuid::new_v4();
            index.insert(id, "n", parent);
            ids.push(id);
            parent = Some(id);
        }
        ids
    }

    #[test]
    fn depth_and_height_count_levels() {
        let mut index = FolderIndex::new();
        let ids = chain(&mut index, 3, None);

        assert_eq!(index.depth(ids[0]).unwrap(), 1);
        assert_eq!(index.depth(ids[2]).unwrap(), 3);
        assert_eq!(index.height(ids[0]), 2);
        assert_eq!(index.height(ids[2]), 0);
    }

    #[test]
    fn fits_under_counts_the_moved_subtree() {
        let mut index = FolderIndex::new();
        let deep = chain(&mut index, MAX_FOLDER_DEPTH - 1, None);
        let moved = chain(&mut index, 2, None);
        let bottom = *deep.last().unwrap();

        // A new leaf lands exactly at the limit.
        assert!(index.fits_under(bottom, None).unwrap());
        // The moved root would sit at the limit but its child one past it.
        assert!(!index.fits_under(bottom, Some(moved[0])).unwrap());
        assert!(index.fits_under(bottom, Some(moved[1])).unwrap());
        assert!(index.find_too_deep().is_none());
    }
}
