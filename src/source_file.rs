//! File wrapper types and ingest utilities.

use std::{
    fs,
    io::{self, Read},
    path::Path,
    sync::Arc,
};

use crate::span::Span;

/// Creates a fake [`SourceFile`] with the given contents.
#[macro_export]
macro_rules! fake_file {
    ($s:expr) => {
        $crate::source_file::SourceFile::fake(
            $crate::source_file::FileName::Fake {
                file: file!(),
                line: line!(),
            },
            String::from($s),
        )
    };
}

/// A source file.
///
/// Source files are relatively cheap to clone, since they store their
/// contents as an `Arc<str>`. The most expensive part of the clone impl is
/// therefore usually the copying of the `path` (if it is [`FileName::Real`]).
#[derive(Clone)]
pub struct SourceFile {
    path: FileName,
    contents: Arc<str>,
}

impl SourceFile {
    pub fn new(path: impl Into<Box<Path>>) -> io::Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path)?.into();
        let path = FileName::Real(path);

        Ok(Self { path, contents })
    }

    /// Reads the entirety of standard input as a source file.
    pub fn stdin() -> io::Result<Self> {
        let mut contents = String::new();
        io::stdin().read_to_string(&mut contents)?;

        Ok(Self {
            path: FileName::Stdin,
            contents: contents.into(),
        })
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn name(&self) -> &FileName {
        &self.path
    }

    /// Maps the start of `span` to a one-based line and column.
    ///
    /// Columns count characters rather than bytes. Offsets past the end of
    /// the file are clamped to the end of the file.
    pub fn location(&self, span: Span) -> Location {
        let offset = (span.start as usize).min(self.contents.len());
        let prefix = match self.contents.get(..offset) {
            Some(prefix) => prefix,
            // the offset is not on a char boundary, so back up to one
            None => {
                let boundary = (0..offset)
                    .rev()
                    .find(|&i| self.contents.is_char_boundary(i))
                    .unwrap_or(0);
                &self.contents[..boundary]
            }
        };

        let line = prefix.matches('\n').count() + 1;
        let line_start = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = prefix[line_start..].chars().count() + 1;

        Location {
            file: self.path.clone(),
            line,
            column,
        }
    }

    /// Creates a fake file with the given path and contents.
    ///
    /// Prefer using the [`fake_file!`] macro, since it generates a fake
    /// path based on the source location it's used in.
    #[allow(unused)]
    pub fn fake(path: FileName, contents: impl Into<Arc<str>>) -> Self {
        let contents = contents.into();
        Self { path, contents }
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let contents =
            format!("... {{{:.3}KiB}}", (self.contents.len() as f64) / 1024f64);
        f.debug_struct("File")
            .field("path", &self.path)
            .field("contents", &contents)
            .finish()
    }
}

#[derive(Clone)]
pub enum FileName {
    Real(Box<Path>),
    Stdin,
    Fake { file: &'static str, line: u32 },
}

impl std::fmt::Debug for FileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real(path) => write!(f, "{:?}", path),
            Self::Stdin => write!(f, "<stdin>"),
            Self::Fake { file, line } => {
                write!(f, "{{fake file in {} (line {})}}", file, line)
            }
        }
    }
}

impl std::fmt::Display for FileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real(path) => write!(f, "{}", path.display()),
            Self::Stdin => write!(f, "<stdin>"),
            Self::Fake { file, line } => write!(f, "<{}:{}>", file, line),
        }
    }
}

/// A human-readable position in a [`SourceFile`].
#[derive(Debug, Clone)]
pub struct Location {
    pub file: FileName,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
