use std::path::PathBuf;

/// Where the static bundle lives. Shared by every request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub public_dir: PathBuf,
    pub index_file: PathBuf,
}

impl AppState {
    pub fn new(public_dir: PathBuf) -> Self {
        let index_file = public_dir.join("index.html");
        Self {
            public_dir,
            index_file,
        }
    }
}
