//! Notifier that drops each message into a directory as a JSON file.
//!
//! A mail relay (or a person) picks the files up from there.

use std::path::{Path, PathBuf};

use chrono::Local;
use fairways_recon::{Notification, Notifier, StoreError};

#[derive(Debug)]
pub struct OutboxNotifier {
    dir: PathBuf,
    sent: usize,
}

impl OutboxNotifier {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf(), sent: 0 }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&mut self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        loop {
            self.sent += 1;
            let path = self.dir.join(format!("{stamp}-{:03}.json", self.sent));
            if !path.exists() {
                return path;
            }
        }
    }
}

impl Notifier for OutboxNotifier {
    fn send(&mut self, message: &Notification) -> Result<(), StoreError> {
        let err = |e: String| StoreError::new("send", e);
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| err(format!("cannot create {}: {e}", self.dir.display())))?;

        let path = self.next_path();
        let json = serde_json::to_string_pretty(message).map_err(|e| err(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| err(format!("{}: {e}", path.display())))?;

        log::info!("queued \"{}\" for {} at {}", message.subject, message.to.join(", "), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn message(subject: &str) -> Notification {
        Notification {
            to: vec!["board@x.com".into()],
            subject: subject.into(),
            text_body: "body".into(),
            html_body: "<p>body</p>".into(),
        }
    }

    #[test]
    fn writes_one_file_per_message() {
        let dir = tempdir().unwrap();
        let outbox = dir.path().join("outbox");
        let mut notifier = OutboxNotifier::new(&outbox);
        notifier.send(&message("first")).unwrap();
        notifier.send(&message("second")).unwrap();

        let mut files: Vec<_> = std::fs::read_dir(&outbox)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files[1]).unwrap()).unwrap();
        assert_eq!(json["subject"], "second");
        assert_eq!(json["to"][0], "board@x.com");
    }
}
