use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use skillport::sources::mock::MockGitHost;
use skillport::sources::{
    InstallOptions, InstallSummary, Installer, LockFile, LockStore, ProjectPaths, SourceSpec,
    integrity_of_dir,
};
use skillport::Result;
use tempfile::TempDir;

pub const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// A temporary project plus an in-memory git host.
pub struct InstallFixture {
    temp: TempDir,
    pub host: MockGitHost,
}

impl InstallFixture {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("create temp dir"),
            host: MockGitHost::new(),
        }
    }

    pub fn base(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::new(self.base())
    }

    pub fn run(&self, sources: &[SourceSpec], options: &InstallOptions) -> Result<InstallSummary> {
        Installer::new(&self.host, self.base()).run(sources, options)
    }

    pub fn install(&self, sources: &[SourceSpec]) -> InstallSummary {
        self.run(sources, &InstallOptions::default())
            .expect("install should succeed")
    }

    pub fn lock(&self) -> LockFile {
        LockStore::new(self.paths().lockfile())
            .read()
            .expect("read lockfile")
    }

    pub fn lock_bytes(&self) -> Vec<u8> {
        std::fs::read(self.paths().lockfile()).expect("read lockfile bytes")
    }

    pub fn curated(&self, name: &str) -> PathBuf {
        self.paths().curated_skills().join(name)
    }

    pub fn curated_file(&self, name: &str, file: &str) -> String {
        std::fs::read_to_string(self.curated(name).join(file)).expect("read curated file")
    }

    /// Digest of the curated copy as it sits on disk now.
    pub fn curated_integrity(&self, name: &str) -> String {
        integrity_of_dir(&self.curated(name)).expect("digest curated skill")
    }

    pub fn locked_integrity(&self, key: &str, name: &str) -> String {
        self.lock()
            .source(key)
            .and_then(|entry| entry.integrity(name))
            .expect("locked skill")
            .to_string()
    }

    pub fn write_local_skill(&self, name: &str) {
        let dir = self.paths().local_skills().join(name);
        std::fs::create_dir_all(&dir).expect("create local skill");
        std::fs::write(dir.join("SKILL.md"), format!("# local {name}\n")).expect("write local skill");
    }
}

pub fn frozen() -> InstallOptions {
    InstallOptions {
        frozen: true,
        ..InstallOptions::default()
    }
}

pub fn update() -> InstallOptions {
    InstallOptions {
        update_sources: true,
        ..InstallOptions::default()
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with WARN-and-above events written to a string.
pub fn with_captured_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().expect("log buffer")).into_owned();
    (out, logs)
}
