use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

use crate::span::FileId;

/// Every source file taking part in one compilation, addressed by [`FileId`].
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<File>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files(it: impl IntoIterator<Item = impl Into<PathBuf>>) -> io::Result<Self> {
        let mut map = Self::new();
        for path in it {
            let path = path.into();
            let source = fs::read_to_string(&path)?;
            map.push(path, source);
        }
        Ok(map)
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> FileId {
        let id = u32::try_from(self.files.len()).expect("file count should fit in u32");
        self.files.push(File::new(path, source));
        FileId(id)
    }

    #[inline]
    pub fn get(&self, id: FileId) -> Option<&File> {
        self.files.get(id.index())
    }

    pub fn files(&self) -> impl ExactSizeIterator<Item = (FileId, &File)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, file)| (FileId(i as u32), file))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug)]
pub struct File {
    path: PathBuf,
    source: String,
    line_starts: Vec<u32>,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();
        Self {
            path: path.into(),
            source,
            line_starts,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn lookup(&self, offset: u32) -> SourceLoc {
        let offset = offset.min(self.source.len() as u32);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line] as usize;
        let col = self
            .source
            .get(start..offset as usize)
            .map_or(0, |prefix| prefix.chars().count());
        SourceLoc { line, col }
    }

    /// Returns the contents of a zero-based line without its terminator.
    pub fn line_contents(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line)? as usize;
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.source.len(), |&next| next as usize);
        let text = &self.source[start..end];
        Some(text.strip_suffix('\n').unwrap_or(text))
    }
}

/// Zero-based line and column, displayed one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLoc {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn lookup_maps_offsets_to_lines() {
        let mut map = SourceMap::new();
        let id = map.push("Main.java", "class A {\n  int x;\n}\n");
        let file = map.get(id).unwrap();

        assert_eq!(file.lookup(0), SourceLoc { line: 0, col: 0 });
        assert_eq!(file.lookup(12), SourceLoc { line: 1, col: 2 });
        assert_eq!(file.lookup(19), SourceLoc { line: 2, col: 0 });
        assert_eq!(file.line_contents(1), Some("  int x;"));
        assert_eq!(file.line_contents(7), None);
    }

    #[test]
    fn files_are_read_from_disk() {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        let map = SourceMap::from_files([&manifest]).unwrap();

        assert_eq!(map.len(), 1);
        let (_, file) = map.files().next().unwrap();
        assert_eq!(file.path(), manifest.as_path());
        assert_eq!(file.line_contents(0), Some("[package]"));
    }
}
