use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

/// Attribute map produced by [`FileObject::to_queryable_map`].
pub type QueryableMap = HashMap<String, Value>;

/// Resource keys and the queryable keys they are renamed to.
///
/// Attributes whose resource key is not listed here are dropped by the projection.
pub const RESOURCE_KEY_MAP: &[(&str, &str)] = &[
    ("fileURL", "url"),
    ("name", "name"),
    ("path", "path"),
    ("fileSize", "fileSize"),
    ("creationDate", "creationDate"),
    ("contentModificationDate", "modifiedDate"),
    ("isHidden", "isHidden"),
    ("isWritable", "isWritable"),
    ("fileResourceType", "type"),
];

pub fn queryable_key(resource_key: &str) -> Option<&'static str> {
    RESOURCE_KEY_MAP
        .iter()
        .find(|(key, _)| *key == resource_key)
        .map(|(_, renamed)| *renamed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Regular,
    Directory,
    SymbolicLink,
    PlaylistEntry,
    #[default]
    Unknown,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Directory => "directory",
            Self::SymbolicLink => "symbolic_link",
            Self::PlaylistEntry => "playlist_entry",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol-agnostic metadata of one filesystem entry.
///
/// Identity is `(url, size, modified_date)` when a url is present and
/// `(path, size, modified_date)` otherwise, so two listings of the same
/// entry with different sizes are different objects.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<Url>,
    name: String,
    path: String,
    #[serde(rename = "type")]
    file_type: Option<FileType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creation_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_read_only: Option<bool>,
    #[serde(skip)]
    auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children_count: Option<u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extended: BTreeMap<String, String>,
}

impl FileObject {
    /// Entry with an explicit type.
    pub fn new(
        url: Option<Url>,
        name: impl Into<String>,
        path: impl Into<String>,
        file_type: FileType,
    ) -> Self {
        Self {
            url,
            name: name.into(),
            path: path.into(),
            file_type: Some(file_type),
            ..Self::default()
        }
    }

    /// Entry reported by a server as an absolute path on `base`.
    ///
    /// A trailing `/` marks a directory.
    pub fn server_entry(
        base: &Url,
        path: &str,
        size: u64,
        modified_date: Option<DateTime<Utc>>,
        auth_token: Option<String>,
    ) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let is_directory = path.len() > 1 && path.ends_with('/');
        let trimmed = path.trim_end_matches('/');
        let name = trimmed.rsplit('/').next().unwrap_or_default().to_string();

        let mut url = base.clone();
        url.set_path(&path);

        Self {
            url: Some(url),
            name,
            path: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
            file_type: Some(if is_directory {
                FileType::Directory
            } else {
                FileType::Regular
            }),
            size: Some(size),
            modified_date,
            auth_token,
            ..Self::default()
        }
    }

    /// Entry produced by a directory listing.
    pub fn directory_entry(
        url: Url,
        name: impl Into<String>,
        path: impl Into<String>,
        is_directory: bool,
        children_count: Option<u64>,
    ) -> Self {
        Self {
            url: Some(url),
            name: name.into(),
            path: path.into(),
            file_type: Some(if is_directory {
                FileType::Directory
            } else {
                FileType::Regular
            }),
            children_count,
            ..Self::default()
        }
    }

    /// Entry of a playlist. `group-title`, `tvg-logo` and `duration` tags are
    /// lifted into group, thumbnail and duration; every tag stays in the
    /// extension table.
    pub fn playlist_entry(url: Url, name: impl Into<String>, tags: BTreeMap<String, String>) -> Self {
        let path = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();
        let group = tags.get("group-title").cloned();
        let thumbnail = tags.get("tvg-logo").and_then(|logo| Url::parse(logo).ok());
        let duration = tags
            .get("duration")
            .and_then(|duration| duration.trim().parse::<f64>().ok());

        Self {
            url: Some(url),
            name: name.into(),
            path,
            file_type: Some(FileType::PlaylistEntry),
            group,
            thumbnail,
            duration,
            extended: tags,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_modified_date(mut self, date: DateTime<Utc>) -> Self {
        self.modified_date = Some(date);
        self
    }

    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.is_hidden = Some(hidden);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.is_read_only = Some(read_only);
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Url) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_children_count(mut self, count: u64) -> Self {
        self.children_count = Some(count);
        self
    }

    pub fn with_extended(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extended.insert(key.into(), value.into());
        self
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type.unwrap_or_default()
    }

    pub fn size(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    pub fn modified_date(&self) -> Option<DateTime<Utc>> {
        self.modified_date
    }

    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden.unwrap_or(false)
    }

    pub fn is_read_only(&self) -> bool {
        self.is_read_only.unwrap_or(false)
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn thumbnail(&self) -> Option<&Url> {
        self.thumbnail.as_ref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Duration in seconds, `-1.0` when not applicable.
    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(-1.0)
    }

    pub fn children_count(&self) -> Option<u64> {
        self.children_count
    }

    pub fn extended(&self, key: &str) -> Option<&str> {
        self.extended.get(key).map(String::as_str)
    }

    pub fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extended
    }

    pub fn is_directory(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    pub fn is_regular_file(&self) -> bool {
        self.file_type() == FileType::Regular
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type() == FileType::SymbolicLink
    }

    /// Extension of the entry name without the dot, if any.
    pub fn extension(&self) -> Option<&str> {
        let (stem, extension) = self.name.rsplit_once('.')?;
        (!stem.is_empty() && !extension.is_empty()).then_some(extension)
    }

    /// Projects the entry into a string-keyed map through [`RESOURCE_KEY_MAP`].
    ///
    /// Attributes outside the table (auth token, thumbnail, group, duration,
    /// children count, extensions) are not carried over.
    pub fn to_queryable_map(&self) -> QueryableMap {
        let mut map: QueryableMap = self
            .resource_values()
            .into_iter()
            .filter_map(|(key, value)| queryable_key(key).map(|key| (key.to_string(), value)))
            .collect();

        map.insert("isDirectory".to_string(), Value::Bool(self.is_directory()));
        map.insert("isReadOnly".to_string(), Value::Bool(self.is_read_only()));
        map.insert("isRegularFile".to_string(), Value::Bool(self.is_regular_file()));
        map.insert("isSymLink".to_string(), Value::Bool(self.is_symlink()));
        map
    }

    fn resource_values(&self) -> Vec<(&'static str, Value)> {
        let mut values = vec![
            ("name", json!(self.name)),
            ("path", json!(self.path)),
            ("fileSize", json!(self.size())),
            ("fileResourceType", json!(self.file_type().as_str())),
            ("isHidden", json!(self.is_hidden())),
            ("isWritable", json!(!self.is_read_only())),
            ("duration", json!(self.duration())),
        ];

        if let Some(url) = &self.url {
            values.push(("fileURL", json!(url.as_str())));
        }
        if let Some(date) = self.creation_date {
            values.push(("creationDate", json!(format_date(date))));
        }
        if let Some(date) = self.modified_date {
            values.push(("contentModificationDate", json!(format_date(date))));
        }
        if let Some(token) = &self.auth_token {
            values.push(("authToken", json!(token)));
        }
        if let Some(group) = &self.group {
            values.push(("group", json!(group)));
        }
        if let Some(count) = self.children_count {
            values.push(("childrenCount", json!(count)));
        }

        values
    }

    fn identity(&self) -> Identity<'_> {
        match &self.url {
            Some(url) => Identity::Url(url.as_str(), self.size(), self.modified_date),
            None => Identity::Path(&self.path, self.size(), self.modified_date),
        }
    }
}

/// Fixed-width RFC 3339 so lexical order matches chronological order.
pub(crate) fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(PartialEq, Eq, Hash)]
enum Identity<'a> {
    Url(&'a str, u64, Option<DateTime<Utc>>),
    Path(&'a str, u64, Option<DateTime<Utc>>),
}

impl PartialEq for FileObject {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for FileObject {}

impl Hash for FileObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}
