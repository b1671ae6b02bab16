//! Target files and settings shared by every basic operation

use metamorph_extension::{Condition, OperationError, TransformationContext};
use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};

/// File an operation acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    /// Path relative to the application root
    Relative(PathBuf),
    /// Path stored, as a string, in a context attribute
    ///
    /// Relative values are resolved against the application root.
    Attribute(String),
}

impl FileTarget {
    /// Target at a relative path
    #[inline]
    #[must_use]
    pub fn relative(path: impl Into<PathBuf>) -> Self {
        Self::Relative(path.into())
    }

    /// Target read from context attribute `name`
    #[inline]
    #[must_use]
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }

    /// Absolute path of the target inside `tree`
    ///
    /// # Errors
    /// - `OperationError::MissingAttribute` if the attribute is unset
    /// - `OperationError::InvalidAttribute` if it is not a string
    /// - `OperationError::Failed` for a path leaving the tree
    pub fn resolve(
        &self,
        tree: &Path,
        context: &TransformationContext,
    ) -> Result<PathBuf, OperationError> {
        match self {
            Self::Relative(path) => inside(tree, path),
            Self::Attribute(name) => {
                let value = context
                    .get(name)
                    .ok_or_else(|| OperationError::MissingAttribute(name.clone()))?;
                let path = value.as_str().ok_or_else(|| OperationError::InvalidAttribute {
                    name: name.clone(),
                    reason: format!("expected a path string, found {value}"),
                })?;
                let path = Path::new(path);
                if path.is_absolute() {
                    let relative = path.strip_prefix(tree).map_err(|_| outside(path))?;
                    inside(tree, relative).map_err(|_| outside(path))
                } else {
                    inside(tree, path)
                }
            }
        }
    }
}

impl Display for FileTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative(path) => write!(f, "{}", path.display()),
            Self::Attribute(name) => write!(f, "${{{name}}}"),
        }
    }
}

impl From<&str> for FileTarget {
    fn from(path: &str) -> Self {
        Self::relative(path)
    }
}

impl From<PathBuf> for FileTarget {
    fn from(path: PathBuf) -> Self {
        Self::Relative(path)
    }
}

/// Join `relative` onto `tree`, refusing anything that escapes it
pub(crate) fn inside(tree: &Path, relative: &Path) -> Result<PathBuf, OperationError> {
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(outside(relative));
    }
    Ok(tree.join(relative))
}

fn outside(path: &Path) -> OperationError {
    OperationError::failed(format!(
        "path {} points outside the application",
        path.display()
    ))
}

/// Criticality and precondition of an operation
#[derive(Debug, Clone, Default)]
pub(crate) struct Settings {
    pub(crate) critical: bool,
    pub(crate) precondition: Option<Condition>,
}

impl Settings {
    pub(crate) fn holds(&self, context: &TransformationContext, tree: &Path) -> bool {
        self.precondition
            .as_ref()
            .map_or(true, |c| c.evaluate(context, tree))
    }
}
