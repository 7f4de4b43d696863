use crate::config::Config;
use crate::generator::QuizGenerator;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<QuizGenerator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, generator: QuizGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
            config: Arc::new(config),
        }
    }

    /// Where an upload named `original_name` is stored: `UPLOAD_DIR/<basename>`.
    ///
    /// Uploads are keyed by their original name only, so two concurrent uploads
    /// with the same name share a path.
    pub fn upload_path(&self, original_name: &str) -> Option<PathBuf> {
        let base = Path::new(original_name.trim()).file_name()?.to_str()?;
        if base.is_empty() || base.starts_with('.') {
            return None;
        }
        Some(self.config.upload_dir.join(base))
    }
}
