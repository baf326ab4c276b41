//! Accounts and sessions
//!
//! Organizing a folder requires a signed-in user. The local service keeps
//! accounts and the current session in one JSON file in the data directory;
//! passwords are stored only as salted digests.

use crate::error::{Error, Result};
use crate::hash::{new_id, password_digest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default session file name inside the data directory
pub const SESSION_FILE: &str = "session.json";

/// Shortest password accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// An account holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
}

/// Session change delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
}

/// Callback invoked on every session change
pub type SessionListener = Box<dyn Fn(&SessionEvent) + Send + Sync>;

/// Identity provider
pub trait SessionService {
    /// The current session, if someone is signed in
    fn current_session(&self) -> Option<Session>;

    /// Register a callback for later session changes
    fn subscribe(&mut self, listener: SessionListener);

    /// Create an account and sign it in
    fn sign_up(&mut self, email: &str, password: &str) -> Result<Session>;

    /// Sign in with email and password
    fn sign_in(&mut self, email: &str, password: &str) -> Result<Session>;

    /// End the current session
    fn sign_out(&mut self) -> Result<()>;

    /// The signed-in user, if any
    fn current_user(&self) -> Option<User> {
        self.current_session().map(|s| s.user)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    user: User,
    password_digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    accounts: Vec<Account>,
    session: Option<Session>,
}

impl SessionFile {
    const VERSION: u32 = 1;

    fn new() -> Self {
        Self {
            version: Self::VERSION,
            accounts: Vec::new(),
            session: None,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Session service backed by a local JSON file
pub struct LocalSessionService {
    path: PathBuf,
    data: SessionFile,
    listeners: Vec<SessionListener>,
}

impl std::fmt::Debug for LocalSessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSessionService")
            .field("path", &self.path)
            .field("accounts", &self.data.accounts.len())
            .field("signed_in", &self.data.session.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl LocalSessionService {
    /// Open the service at `path`, starting with no accounts when the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let file = File::open(&path)
                .map_err(|e| Error::Auth(format!("Failed to open session file: {}", e)))?;
            let data: SessionFile = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| Error::Auth(format!("Failed to parse session file: {}", e)))?;
            if data.version != SessionFile::VERSION {
                return Err(Error::Auth(format!(
                    "Unsupported session file version {} (expected {})",
                    data.version,
                    SessionFile::VERSION
                )));
            }
            data
        } else {
            debug!(?path, "Session file does not exist, starting signed out");
            SessionFile::new()
        };

        Ok(Self {
            path,
            data,
            listeners: Vec::new(),
        })
    }

    /// Open `session.json` inside a data directory
    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir.join(SESSION_FILE))
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let file = File::create(&temp_path)
            .map_err(|e| Error::Auth(format!("Failed to create temp session file: {}", e)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.data)
            .map_err(|e| Error::Auth(format!("Failed to write session file: {}", e)))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::Auth(format!("Failed to rename temp session file: {}", e)))?;
        Ok(())
    }

    fn notify(&self, event: &SessionEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    fn start_session(&mut self, user: User) -> Result<Session> {
        let issued_at = Utc::now();
        let session = Session {
            access_token: new_id(&["session", &user.id, &user.email]),
            user,
            issued_at,
        };

        let previous = self.data.session.replace(session.clone());
        if let Err(e) = self.save() {
            self.data.session = previous;
            return Err(e);
        }

        info!(user = %session.user.email, "Signed in");
        self.notify(&SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }
}

impl SessionService for LocalSessionService {
    fn current_session(&self) -> Option<Session> {
        self.data.session.clone()
    }

    fn subscribe(&mut self, listener: SessionListener) {
        self.listeners.push(listener);
    }

    fn sign_up(&mut self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Auth("Unable to validate email address: invalid format".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Auth(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.data.accounts.iter().any(|a| a.user.email == email) {
            return Err(Error::Auth("User already registered".into()));
        }

        let user = User {
            id: new_id(&["user", &email]),
            email: email.clone(),
            created_at: Utc::now(),
        };
        self.data.accounts.push(Account {
            user: user.clone(),
            password_digest: password_digest(&email, password),
        });
        if let Err(e) = self.save() {
            self.data.accounts.pop();
            return Err(e);
        }

        info!(user = %email, "Account created");
        self.start_session(user)
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        let digest = password_digest(&email, password);

        let user = self
            .data
            .accounts
            .iter()
            .find(|a| a.user.email == email && a.password_digest == digest)
            .map(|a| a.user.clone());

        match user {
            Some(user) => self.start_session(user),
            None => {
                warn!(user = %email, "Rejected sign-in");
                Err(Error::Auth("Invalid login credentials".into()))
            }
        }
    }

    fn sign_out(&mut self) -> Result<()> {
        let Some(previous) = self.data.session.take() else {
            debug!("Sign-out without a session");
            return Ok(());
        };

        if let Err(e) = self.save() {
            self.data.session = Some(previous);
            return Err(e);
        }

        info!(user = %previous.user.email, "Signed out");
        self.notify(&SessionEvent::SignedOut);
        Ok(())
    }
}
