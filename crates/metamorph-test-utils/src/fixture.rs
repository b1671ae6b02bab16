//! Application fixtures on disk

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Application folder living inside its own temporary directory
///
/// The temporary directory is the application's parent, so staged copies
/// created next to the application are cleaned up with the fixture.
#[derive(Debug)]
pub struct ApplicationFixture {
    root: TempDir,
    folder: PathBuf,
}

impl ApplicationFixture {
    /// Create empty application folder named `name`
    ///
    /// # Panics
    /// If the temporary directory cannot be created.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join(name);
        fs::create_dir(&folder).unwrap();
        Self { root, folder }
    }

    /// Small Maven-like project used across tests
    #[must_use]
    pub fn sample(name: &str) -> Self {
        Self::new(name)
            .with_file("pom.xml", "<project>\n  <version>1.0</version>\n</project>\n")
            .with_file("README.md", "# Sample\n")
            .with_file(
                "src/main/java/App.java",
                "public class App {\n    // java 8\n}\n",
            )
            .with_file("src/main/resources/application.properties", "server.port=8080\n")
            .with_dir("src/test/java")
    }

    /// Add a file, creating parent folders
    #[must_use]
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.folder.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    #[must_use]
    pub fn with_dir(self, relative: &str) -> Self {
        fs::create_dir_all(self.folder.join(relative)).unwrap();
        self
    }

    /// Application folder
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.folder
    }

    /// Temporary parent of the application folder
    #[must_use]
    pub fn parent(&self) -> &Path {
        self.root.path()
    }

    /// Folders next to the application, other than the application itself
    #[must_use]
    pub fn siblings(&self) -> Vec<PathBuf> {
        let mut siblings: Vec<PathBuf> = fs::read_dir(self.root.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path != &self.folder)
            .collect();
        siblings.sort();
        siblings
    }

    /// Copy the application to `<parent>/<name>`, to use as a baseline
    #[must_use]
    pub fn snapshot(&self, name: &str) -> PathBuf {
        let destination = self.root.path().join(name);
        copy_dir(&self.folder, &destination);
        destination
    }

    /// Read a file of the application as text
    #[must_use]
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.folder.join(relative)).unwrap()
    }
}

/// Recursively copy `source` into a new folder `destination`
///
/// # Panics
/// On any I/O failure.
pub fn copy_dir(source: &Path, destination: &Path) {
    fs::create_dir_all(destination).unwrap();
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.unwrap();
        let target = destination.join(entry.path().strip_prefix(source).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}
