use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub file: FileId,
}

impl Span {
    #[inline]
    pub fn new(start: u32, end: u32, file: FileId) -> Self {
        Span { start, end, file }
    }

    /// An empty span for code synthesized without any source counterpart.
    #[inline]
    pub fn synthetic() -> Self {
        Span::new(0, 0, FileId::SYNTHETIC)
    }

    pub fn contains(&self, pos: u32) -> bool {
        self.start <= pos && pos < self.end
    }

    pub fn merge(&self, other: &Self) -> Self {
        assert_eq!(self.file, other.file);
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file: self.file,
        }
    }
}

impl From<(FileId, std::ops::Range<u32>)> for Span {
    #[inline]
    fn from((file, range): (FileId, std::ops::Range<u32>)) -> Self {
        Span::new(range.start, range.end, file)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}@{}", self.start, self.end, self.file.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub(crate) u32);

impl FileId {
    /// Never assigned by a [`SourceMap`](crate::SourceMap).
    pub const SYNTHETIC: Self = Self(u32::MAX);

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}
