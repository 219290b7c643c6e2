//! Key directories laid out on disk for integration flows.

use fg_message_security::{MessageCodec, SecurityOptions};
use shared_crypto::RsaKeyPair;
use shared_types::Role;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

pub fn operator_key() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(2048).unwrap())
}

pub fn server_key() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(2048).unwrap())
}

pub fn intruder_key() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| RsaKeyPair::generate(2048).unwrap())
}

/// A deployment: one shared certificate directory plus per-actor key dirs.
pub struct Site {
    root: TempDir,
}

impl Site {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("clients")).unwrap();
        Self { root }
    }

    pub fn cert_dir(&self) -> PathBuf {
        self.root.path().join("clients")
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    /// Write `<dir>/<name>-private.pem` and `<dir>/<name>.pem`, returning both.
    pub fn install_pair(&self, dir: &str, name: &str, pair: &RsaKeyPair) -> (PathBuf, PathBuf) {
        let dir = self.path(dir);
        std::fs::create_dir_all(&dir).unwrap();
        let private = dir.join(format!("{name}-private.pem"));
        let public = dir.join(format!("{name}.pem"));
        std::fs::write(&private, pair.private_key_pem().unwrap()).unwrap();
        std::fs::write(&public, pair.public().pem()).unwrap();
        (private, public)
    }

    /// Place `pair`'s public key in the certificate directory as `name`.
    pub fn distribute(&self, name: &str, pair: &RsaKeyPair) {
        std::fs::write(self.cert_dir().join(format!("{name}.pem")), pair.public().pem()).unwrap();
    }

    pub fn caller(&self, name: &str, pair: &RsaKeyPair, extra: &[(&str, &str)]) -> MessageCodec {
        self.caller_in(&format!("home/{name}"), name, pair, extra)
    }

    /// A caller whose key pair lives in `dir`, e.g. a second actor claiming
    /// an existing name.
    pub fn caller_in(
        &self,
        dir: &str,
        name: &str,
        pair: &RsaKeyPair,
        extra: &[(&str, &str)],
    ) -> MessageCodec {
        let (private, public) = self.install_pair(dir, name, pair);
        let mut options = vec![
            ("client_private".to_string(), path_str(&private)),
            ("client_public".to_string(), path_str(&public)),
        ];
        options.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        build(options, Role::Caller)
    }

    pub fn responder(&self, name: &str, pair: &RsaKeyPair, extra: &[(&str, &str)]) -> MessageCodec {
        let (private, public) = self.install_pair("server", name, pair);
        let mut options = vec![
            ("server_private".to_string(), path_str(&private)),
            ("server_public".to_string(), path_str(&public)),
            ("client_cert_dir".to_string(), path_str(&self.cert_dir())),
        ];
        options.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        build(options, Role::Responder)
    }
}

fn build(options: Vec<(String, String)>, role: Role) -> MessageCodec {
    let config = SecurityOptions::from_options(options)
        .unwrap()
        .validate(role)
        .unwrap();
    MessageCodec::new(config).unwrap()
}

pub fn path_str(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}
