//! Shared scaffolding for CLI integration specs: a scratch project
//! directory plus fluent assertions over `assert_cmd`.

use std::path::Path;

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use tempfile::TempDir;

pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, relative: &str, contents: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture parent dirs");
        }
        std::fs::write(path, contents).expect("write fixture file");
    }

    pub fn barf(&self) -> Command {
        let mut cmd = Command::cargo_bin("barf").expect("barf binary");
        cmd.current_dir(self.path());
        cmd
    }
}

pub trait CommandExt {
    fn passes(&mut self) -> Assert;
    fn fails(&mut self) -> Assert;
}

impl CommandExt for Command {
    fn passes(&mut self) -> Assert {
        self.assert().success()
    }

    fn fails(&mut self) -> Assert {
        self.assert().failure()
    }
}

pub trait AssertExt {
    fn stdout_has(self, needle: &str) -> Self;
    fn stderr_has(self, needle: &str) -> Self;
}

impl AssertExt for Assert {
    fn stdout_has(self, needle: &str) -> Self {
        let text = String::from_utf8_lossy(&self.get_output().stdout).to_string();
        assert!(text.contains(needle), "expected stdout to contain {needle:?}, got:\n{text}");
        self
    }

    fn stderr_has(self, needle: &str) -> Self {
        let text = String::from_utf8_lossy(&self.get_output().stderr).to_string();
        assert!(text.contains(needle), "expected stderr to contain {needle:?}, got:\n{text}");
        self
    }
}
