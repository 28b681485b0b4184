use super::models::ConversationRow;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").unwrap());

/// Case-insensitive search over name, label and phone number
pub fn filter_conversations<'a>(rows: &'a [ConversationRow], query: &str) -> Vec<&'a ConversationRow> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return rows.iter().collect();
    }

    rows.iter()
        .filter(|row| {
            [&row.name, &row.label, &row.phone_number]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&query))
        })
        .collect()
}

/// Name shown in the conversation list: name, then phone, then user id
pub fn display_name(row: &ConversationRow) -> &str {
    [&row.name, &row.phone_number]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or(row.whatsapp_user_id.as_str())
}

/// Digits of a phone number, keeping a leading `+`
pub fn normalize_phone(phone: &str) -> Option<String> {
    let trimmed = phone.trim();
    let digits = NON_DIGITS.replace_all(trimmed, "");
    if digits.is_empty() {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits.into_owned())
    }
}

/// Stable key for per-conversation data such as nicknames: the normalized
/// phone number, then the contact name, then the backend user id.
pub fn identity_key(row: &ConversationRow) -> String {
    if let Some(phone) = row.phone_number.as_deref().and_then(normalize_phone) {
        return format!("phone:{}", phone);
    }

    if let Some(name) = row
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        return format!("name:{}", name.to_lowercase());
    }

    format!("id:{}", row.whatsapp_user_id)
}

/// Key-value storage for user-assigned conversation nicknames
pub trait NicknameStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Set a nickname; a blank nickname removes the entry
    fn set(&mut self, key: &str, nickname: &str) -> Result<()>;

    /// Returns whether an entry existed
    fn remove(&mut self, key: &str) -> Result<bool>;

    fn entries(&self) -> Vec<(String, String)>;

    fn nickname_for(&self, row: &ConversationRow) -> Option<String> {
        self.get(&identity_key(row))
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryNicknameStore {
    nicknames: BTreeMap<String, String>,
}

impl MemoryNicknameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NicknameStore for MemoryNicknameStore {
    fn get(&self, key: &str) -> Option<String> {
        self.nicknames.get(key).cloned()
    }

    fn set(&mut self, key: &str, nickname: &str) -> Result<()> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            self.nicknames.remove(key);
        } else {
            self.nicknames.insert(key.to_string(), nickname.to_string());
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.nicknames.remove(key).is_some())
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.nicknames
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Nickname map persisted as a JSON object, written on every change
pub struct FileNicknameStore {
    path: PathBuf,
    inner: MemoryNicknameStore,
}

impl FileNicknameStore {
    pub fn open(path: &Path) -> Result<Self> {
        let nicknames = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read nickname store {}", path.display()))?;
            match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Ignoring corrupt nickname store {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!("Loaded {} nicknames from {}", nicknames.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            inner: MemoryNicknameStore { nicknames },
        })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.inner.nicknames)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write nickname store {}", self.path.display()))
    }
}

impl NicknameStore for FileNicknameStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, nickname: &str) -> Result<()> {
        self.inner.set(key, nickname)?;
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let existed = self.inner.remove(key)?;
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.inner.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convo(id: &str, name: Option<&str>, phone: Option<&str>, label: Option<&str>) -> ConversationRow {
        ConversationRow {
            whatsapp_user_id: id.to_string(),
            name: name.map(str::to_string),
            phone_number: phone.map(str::to_string),
            label: label.map(str::to_string),
            content: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_filter_matches_any_field() {
        let rows = vec![
            convo("1", Some("Alice Smith"), Some("+44 7700 900001"), Some("Buyer")),
            convo("2", Some("Bob"), None, Some("Seller")),
            convo("3", None, Some("0161 496 0000"), None),
        ];

        let names = |q: &str| -> Vec<String> {
            filter_conversations(&rows, q)
                .iter()
                .map(|r| r.whatsapp_user_id.clone())
                .collect()
        };

        assert_eq!(names("  "), vec!["1", "2", "3"]);
        assert_eq!(names("ALICE"), vec!["1"]);
        assert_eq!(names("seller"), vec!["2"]);
        assert_eq!(names("496"), vec!["3"]);
        assert!(names("nobody").is_empty());
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name(&convo("u1", Some(" Ann "), Some("123"), None)), "Ann");
        assert_eq!(display_name(&convo("u1", Some(""), Some(" 123 "), None)), "123");
        assert_eq!(display_name(&convo("u1", None, None, None)), "u1");
    }

    #[test]
    fn test_identity_key_prefers_phone() {
        let with_phone = convo("u1", Some("Ann"), Some("+44 (7700) 900-001"), None);
        let with_name = convo("u2", Some(" Ann Lee "), Some("n/a"), None);
        let bare = convo("u3", Some("  "), None, None);

        assert_eq!(identity_key(&with_phone), "phone:+447700900001");
        assert_eq!(identity_key(&with_name), "name:ann lee");
        assert_eq!(identity_key(&bare), "id:u3");
    }

    #[test]
    fn test_identity_key_ignores_phone_formatting() {
        let a = convo("u1", None, Some("07700 900001"), None);
        let b = convo("u9", None, Some("07700-900-001"), None);
        assert_eq!(identity_key(&a), identity_key(&b));
    }

    #[test]
    fn test_memory_store_set_get_remove() {
        let mut store = MemoryNicknameStore::new();
        let row = convo("u1", Some("Ann"), Some("123"), None);

        store.set(&identity_key(&row), " VIP ").unwrap();
        assert_eq!(store.nickname_for(&row).as_deref(), Some("VIP"));

        store.set(&identity_key(&row), "   ").unwrap();
        assert_eq!(store.nickname_for(&row), None);

        store.set("id:x", "later").unwrap();
        assert!(store.remove("id:x").unwrap());
        assert!(!store.remove("id:x").unwrap());
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("nicknames.json");

        {
            let mut store = FileNicknameStore::open(&path).unwrap();
            store.set("phone:123", "Landlord").unwrap();
            store.set("name:bob", "Cash buyer").unwrap();
        }

        let store = FileNicknameStore::open(&path).unwrap();
        assert_eq!(store.get("phone:123").as_deref(), Some("Landlord"));
        assert_eq!(
            store.entries(),
            vec![
                ("name:bob".to_string(), "Cash buyer".to_string()),
                ("phone:123".to_string(), "Landlord".to_string()),
            ]
        );
    }

    #[test]
    fn test_file_store_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nicknames.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileNicknameStore::open(&path).unwrap();
        assert!(store.entries().is_empty());
    }
}
