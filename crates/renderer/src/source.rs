use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// The four files a raymarch compute program is assembled from.
///
/// Only `scene` is expected to change while the viewer runs. The order is
/// fixed: the scene uses symbols from `library` and `main` calls into the
/// scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramSources {
    pub base: PathBuf,
    pub library: PathBuf,
    pub scene: PathBuf,
    pub main: PathBuf,
}

impl ProgramSources {
    /// Reads all four files and concatenates them as `base ++ library ++ scene ++ main`.
    pub fn aggregate(&self) -> String {
        let base = read_source(&self.base);
        let library = read_source(&self.library);
        let scene = read_source(&self.scene);
        let main = read_source(&self.main);
        aggregate_texts(&base, &library, &scene, &main)
    }
}

/// Reads a shader source file, yielding empty text when it cannot be read.
pub fn read_source(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read shader source");
            String::new()
        }
    }
}

pub fn aggregate_texts(base: &str, library: &str, scene: &str, main: &str) -> String {
    let mut source = String::with_capacity(base.len() + library.len() + scene.len() + main.len());
    source.push_str(base);
    source.push_str(library);
    source.push_str(scene);
    source.push_str(main);
    source
}
