use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, AppResult};
use crate::services::VersionControlService;

pub struct GitCli {
    project_path: PathBuf,
}

impl GitCli {
    pub fn new(project_path: PathBuf) -> Self {
        Self { project_path }
    }

    async fn run(&self, args: &[&str]) -> AppResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.project_path)
            .output()
            .await
            .map_err(|err| AppError::VersionControl(format!("failed to spawn git: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::VersionControl(format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VersionControlService for GitCli {
    async fn diff_text(&self, range: &str) -> AppResult<String> {
        self.run(&["diff", range]).await
    }

    async fn commit_log(&self, range: &str, filepath: &str) -> AppResult<String> {
        self.run(&["log", range, "--format=%H %s", "--", filepath])
            .await
    }
}
