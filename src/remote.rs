use crate::config::Config;

use chrono::Utc;
use log::{debug, trace};
use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use sha1::{Digest, Sha1};
use thiserror::Error;

const API_PATH: &str = "index.php/apps/passwords/api/1.0";

// Reserved id of the root ("Home") folder on every Nextcloud Passwords instance
pub const ROOT_FOLDER: &str = "00000000-0000-0000-0000-000000000000";

// Writable attributes the client never edits itself. The service resets any of
// them missing from an update, so they are sent back as they were read.
const CARRIED_FIELDS: [&str; 6] = ["favorite", "hidden", "tags", "customFields", "cseType", "cseKey"];

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Could not set up the HTTP client")]
    ClientError(#[source] reqwest::Error),
    #[error("Request to {0} failed")]
    RequestError(String, #[source] reqwest::Error),
    #[error("{endpoint} answered {status}: {message}")]
    StatusError {
        endpoint: String,
        status: StatusCode,
        message: String,
    },
    #[error("Unexpected response from {0}")]
    DecodeError(String, #[source] reqwest::Error),
    #[error("Password '{0}' has not been saved yet")]
    NotPersisted(String),
}

/// One password entry as stored by the Passwords app.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Password {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
    #[serde(default = "root_folder", deserialize_with = "null_as_root")]
    pub folder: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hash: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub edited: i64,
    // Every other attribute of the server object
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Password {
    /// An unsaved entry carrying only a label and, if given, a username.
    pub fn template(label: &str, username: Option<&str>) -> Self {
        Password {
            id: None,
            label: label.to_string(),
            username: username.unwrap_or_default().to_string(),
            password: String::new(),
            url: String::new(),
            notes: String::new(),
            folder: root_folder(),
            hash: String::new(),
            revision: None,
            edited: 0,
            extra: Map::new(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.as_deref().map_or(false, |id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Folder {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub label: String,
}

// Body of every create/update/delete answer
#[derive(Debug, Deserialize)]
struct WriteReceipt {
    id: String,
    #[serde(default)]
    revision: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn root_folder() -> String {
    ROOT_FOLDER.to_string()
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_root<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|folder| !folder.is_empty())
        .unwrap_or_else(root_folder))
}

pub fn sha1_hex(secret: &str) -> String {
    hex::encode(Sha1::digest(secret.as_bytes()))
}

/// The remote side of every command: the full password and folder
/// collections plus the three write operations.
pub trait Repository {
    fn passwords(&self) -> Result<Vec<Password>, RemoteError>;
    fn folders(&self) -> Result<Vec<Folder>, RemoteError>;
    fn create(&self, password: &Password) -> Result<Password, RemoteError>;
    fn update(&self, password: &Password) -> Result<Password, RemoteError>;
    fn delete(&self, password: &Password) -> Result<(), RemoteError>;
}

pub struct NextcloudClient {
    http: Client,
    base_url: String,
    user: String,
    token: String,
}

impl NextcloudClient {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RemoteError::ClientError)?;

        Ok(NextcloudClient {
            http,
            base_url: config.url.clone(),
            user: config.user.clone(),
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PATH, path)
    }

    fn call<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, RemoteError> {
        let endpoint = self.endpoint(path);
        trace!("{} {}", method, endpoint);

        let mut request = self
            .http
            .request(method, &endpoint)
            .basic_auth(&self.user, Some(&self.token));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .map_err(|err| RemoteError::RequestError(endpoint.clone(), err))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response);
            return Err(RemoteError::StatusError { endpoint, status, message });
        }

        response
            .json::<T>()
            .map_err(|err| RemoteError::DecodeError(endpoint, err))
    }

    fn write(&self, method: Method, path: &str, password: &Password) -> Result<Password, RemoteError> {
        let (body, hash, edited) = write_body(password);
        let receipt: WriteReceipt = self.call(method, path, Some(body))?;
        debug!("Stored '{}' as {} (revision {:?})", password.label, receipt.id, receipt.revision);

        Ok(Password {
            id: Some(receipt.id),
            revision: receipt.revision,
            hash,
            edited,
            ..password.clone()
        })
    }
}

impl Repository for NextcloudClient {
    fn passwords(&self) -> Result<Vec<Password>, RemoteError> {
        let passwords: Vec<Password> = self.call(Method::GET, "password/list", None)?;
        debug!("Fetched {} passwords", passwords.len());
        Ok(passwords)
    }

    fn folders(&self) -> Result<Vec<Folder>, RemoteError> {
        let folders: Vec<Folder> = self.call(Method::GET, "folder/list", None)?;
        debug!("Fetched {} folders", folders.len());
        Ok(folders)
    }

    fn create(&self, password: &Password) -> Result<Password, RemoteError> {
        self.write(Method::POST, "password/create", password)
    }

    fn update(&self, password: &Password) -> Result<Password, RemoteError> {
        if !password.is_persisted() {
            return Err(RemoteError::NotPersisted(password.label.clone()));
        }
        self.write(Method::PATCH, "password/update", password)
    }

    fn delete(&self, password: &Password) -> Result<(), RemoteError> {
        let id = match password.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(RemoteError::NotPersisted(password.label.clone())),
        };
        let receipt: WriteReceipt = self.call(Method::DELETE, "password/delete", Some(json!({ "id": id })))?;
        debug!("Deleted {} (revision {:?})", receipt.id, receipt.revision);
        Ok(())
    }
}

// The service requires the SHA-1 of the secret on every write and tracks the
// time of the last secret change in `edited`.
fn write_body(password: &Password) -> (Value, String, i64) {
    let hash = sha1_hex(&password.password);
    let edited = if hash != password.hash || password.edited == 0 {
        Utc::now().timestamp()
    } else {
        password.edited
    };

    let mut body = json!({
        "label": password.label,
        "username": password.username,
        "password": password.password,
        "url": password.url,
        "notes": password.notes,
        "folder": password.folder,
        "hash": hash,
        "edited": edited,
    });
    if let Some(id) = password.id.as_deref().filter(|id| !id.is_empty()) {
        body["id"] = json!(id);
    }
    for field in CARRIED_FIELDS {
        if let Some(value) = password.extra.get(field) {
            body[field] = value.clone();
        }
    }

    (body, hash, edited)
}

fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.message,
        Err(_) if !text.trim().is_empty() => text.trim().to_string(),
        Err(_) => status.canonical_reason().unwrap_or("no message").to_string(),
    }
}


#[cfg(test)]
mod remote_tests {
    use super::*;

    #[test]
    fn test_template_is_not_persisted() {
        let template = Password::template("mail", Some("alice"));
        assert!(!template.is_persisted());
        assert_eq!(template.label, "mail");
        assert_eq!(template.username, "alice");
        assert_eq!(template.folder, ROOT_FOLDER);

        let empty_id = Password { id: Some(String::new()), ..template };
        assert!(!empty_id.is_persisted());
    }

    #[test]
    fn test_sha1_hex() {
        assert_eq!(sha1_hex("password"), "5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8");
    }

    // the list endpoint returns many more fields than the client uses, some of them null
    #[test]
    fn test_decode_password_list() {
        let body = r#"[
            {"id": "a1", "label": "mail", "username": "alice", "password": "hunter2",
             "url": null, "notes": "", "folder": "f1", "hash": "x", "revision": "r1",
             "edited": 1700000000, "favorite": false, "cseType": "none", "tags": []},
            {"id": "b2", "label": "bank", "password": "secret"}
        ]"#;
        let passwords: Vec<Password> = serde_json::from_str(body).unwrap();
        assert_eq!(passwords.len(), 2);
        assert_eq!(passwords[0].id.as_deref(), Some("a1"));
        assert_eq!(passwords[0].url, "");
        assert_eq!(passwords[0].folder, "f1");
        assert_eq!(passwords[1].username, "");
        assert_eq!(passwords[1].folder, ROOT_FOLDER);
    }

    #[test]
    fn test_decode_folder_list() {
        let body = r#"[{"id": "f1", "label": "Work", "parent": "00000000-0000-0000-0000-000000000000"}]"#;
        let folders: Vec<Folder> = serde_json::from_str(body).unwrap();
        assert_eq!(folders, vec![Folder { id: "f1".to_string(), label: "Work".to_string() }]);
    }

    #[test]
    fn test_write_body_for_new_password() {
        let mut password = Password::template("mail", Some("alice"));
        password.password = "hunter2".to_string();
        let (body, hash, edited) = write_body(&password);
        assert_eq!(hash, sha1_hex("hunter2"));
        assert!(edited > 0);
        assert_eq!(body["label"], "mail");
        assert_eq!(body["hash"], hash.as_str());
        assert_eq!(body["folder"], ROOT_FOLDER);
        assert!(body.get("id").is_none());
    }

    // attributes ncpass never edits must go back unchanged or the service resets them
    #[test]
    fn test_write_body_carries_server_attributes() {
        let body = r#"{"id": "a1", "label": "mail", "username": "alice", "password": "hunter2",
            "folder": "f1", "hash": "x", "edited": 1700000000, "favorite": true, "hidden": false,
            "tags": ["t1"], "customFields": "[{\"label\":\"pin\",\"type\":\"secret\",\"value\":\"1234\"}]",
            "cseType": "none", "created": 1600000000, "status": 0}"#;
        let mut password: Password = serde_json::from_str(body).unwrap();
        assert_eq!(password.extra.get("favorite"), Some(&json!(true)));
        password.url = "https://mail.example".to_string();

        let (update, _, _) = write_body(&password);
        assert_eq!(update["id"], "a1");
        assert_eq!(update["url"], "https://mail.example");
        assert_eq!(update.get("favorite"), Some(&json!(true)));
        assert_eq!(update.get("hidden"), Some(&json!(false)));
        assert_eq!(update.get("tags"), Some(&json!(["t1"])));
        assert_eq!(update.get("customFields"), password.extra.get("customFields"));
        assert_eq!(update.get("cseType"), Some(&json!("none")));
        // read-only attributes stay out of the request
        assert!(update.get("created").is_none());
        assert!(update.get("status").is_none());
    }

    #[test]
    fn test_write_body_keeps_edited_when_secret_unchanged() {
        let mut password = Password::template("mail", None);
        password.id = Some("a1".to_string());
        password.password = "hunter2".to_string();
        password.hash = sha1_hex("hunter2");
        password.edited = 1_600_000_000;

        let (body, _, edited) = write_body(&password);
        assert_eq!(edited, 1_600_000_000);
        assert_eq!(body["id"], "a1");

        password.password = "correct horse".to_string();
        let (_, _, edited) = write_body(&password);
        assert!(edited > 1_600_000_000);
    }

    #[test]
    fn test_endpoint_layout() {
        let config = Config {
            url: "https://cloud.example.com".to_string(),
            user: "alice".to_string(),
            token: "app-token".to_string(),
            timeout: std::time::Duration::from_secs(1),
        };
        let client = NextcloudClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("password/list"),
            "https://cloud.example.com/index.php/apps/passwords/api/1.0/password/list"
        );
    }

    #[test]
    fn test_client_refuses_unsaved_writes() {
        let config = Config {
            url: "http://127.0.0.1:9".to_string(),
            user: "alice".to_string(),
            token: "app-token".to_string(),
            timeout: std::time::Duration::from_secs(1),
        };
        let client = NextcloudClient::new(&config).unwrap();
        let template = Password::template("mail", None);
        assert!(matches!(client.update(&template), Err(RemoteError::NotPersisted(_))));
        assert!(matches!(client.delete(&template), Err(RemoteError::NotPersisted(_))));
    }
}
