//! Central plumbing between CLI commands and library functions.

use std::path::Path;

use thiserror::Error;

use crate::{
    ast::{Expr, print::print_expr},
    interp::{self, RuntimeError},
    parser::{self, ParseError},
    source_file::{Location, SourceFile},
    span::{Span, Spanned},
    ty::print::{DEFAULT_WIDTH, TyPrinter},
    typeck::{self, TypeError},
};

/// The public result type of the [`driver`] module.
///
/// [`driver`]: self
pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{location}: parse error: {source}")]
    Parse {
        location: Location,
        source: ParseError,
    },
    #[error("{location}: type error: {source}")]
    Type {
        location: Location,
        source: TypeError,
    },
    #[error("{location}: runtime error: {source}")]
    Runtime {
        location: Location,
        source: RuntimeError,
    },
}

impl Error {
    /// Returns the source span the error points at, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Io(_) => None,
            Error::Parse { source, .. } => Some(source.span()),
            Error::Type { source, .. } => Some(source.span()),
            Error::Runtime { source, .. } => Some(source.span()),
        }
    }
}

/// Loads the program at `input`, or from standard input if there is none.
pub fn load(input: Option<&Path>) -> Result<SourceFile> {
    let file = match input {
        Some(path) => SourceFile::new(path)?,
        None => SourceFile::stdin()?,
    };

    log::debug!(
        "loaded {} ({} bytes)",
        file.name(),
        file.contents().len()
    );

    Ok(file)
}

#[derive(Debug, Clone)]
pub struct DriverContext {
    /// The line width used for printed types, values, and source.
    pub width: usize,
}

impl Default for DriverContext {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
        }
    }
}

impl DriverContext {
    /// Type-checks `file` and returns its printed principal type.
    pub fn check(&self, file: &SourceFile) -> Result<String> {
        let expr = parse(file)?;
        let ty = typeck::type_check(&expr).map_err(|source| Error::Type {
            location: file.location(source.span()),
            source,
        })?;

        Ok(TyPrinter::with_width(self.width).print(&ty))
    }

    /// Type-checks and then evaluates `file`, returning its printed value.
    pub fn run(&self, file: &SourceFile) -> Result<String> {
        let expr = parse(file)?;
        let ty = typeck::type_check(&expr).map_err(|source| Error::Type {
            location: file.location(source.span()),
            source,
        })?;
        log::info!("{} has type {ty}", file.name());

        let value = interp::evaluate(&expr).map_err(|source| Error::Runtime {
            location: file.location(source.span()),
            source,
        })?;

        Ok(value.print(self.width))
    }

    /// Parses `file` and returns it in canonical form.
    pub fn fmt(&self, file: &SourceFile) -> Result<String> {
        let expr = parse(file)?;
        Ok(print_expr(&expr, self.width))
    }
}

fn parse(file: &SourceFile) -> Result<Spanned<Expr>> {
    let expr = parser::parse(file.contents()).map_err(|source| Error::Parse {
        location: file.location(source.span()),
        source,
    })?;

    log::debug!("parsed {}", file.name());
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_file;

    #[test]
    fn diagnostics_point_into_the_file() {
        let file = fake_file!("(let x 1\n  (+ x \"two\"))");
        let error = DriverContext::default().check(&file).unwrap_err();

        assert!(matches!(error, Error::Type { .. }));
        assert_eq!(error.span(), Some(Span::new(11, 22)));

        let rendered = error.to_string();
        assert!(rendered.contains(":2:3: type error: "), "{rendered}");
        assert!(rendered.ends_with("expected int, found str"), "{rendered}");
    }

    #[test]
    fn stages_are_reported() {
        let context = DriverContext::default();

        let parse = context.check(&fake_file!("(let x)")).unwrap_err();
        assert!(parse.to_string().contains("parse error"));

        let runtime = context.run(&fake_file!("(car empty)")).unwrap_err();
        assert!(matches!(runtime, Error::Runtime { .. }));
        assert!(runtime.to_string().contains("runtime error"));
    }

    #[test]
    fn run_does_not_evaluate_ill_typed_programs() {
        let error = DriverContext::default()
            .run(&fake_file!("(set-ref 1 2)"))
            .unwrap_err();
        assert!(matches!(error, Error::Type { .. }));
    }

    #[test]
    fn width_is_respected() {
        let context = DriverContext { width: 12 };
        let file = fake_file!("(list 100 200 300)");

        assert_eq!(context.run(&file).unwrap(), "(list\n  100\n  200\n  300)");
        assert_eq!(context.fmt(&file).unwrap(), "(list\n  100\n  200\n  300)");
    }
}
