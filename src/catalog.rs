use crate::Error;
use crate::UID_PADDING;
use crate::cards::Card;
use std::collections::HashMap;
use std::path::Path;

/// Static tag UID to card label mapping, loaded once at startup.
///
/// Keys are lowercase hex. Readers report either the bare UID or the UID
/// already padded to the tag's full width, so both forms are accepted.
#[derive(Debug, Clone, Default)]
pub struct Catalog(HashMap<String, String>);

#[derive(serde::Deserialize)]
struct CatalogFile {
    card_ids: HashMap<String, String>,
}

impl Catalog {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file = serde_yaml::from_str::<CatalogFile>(&text)?;
        let catalog = Self::from(file.card_ids);
        log::info!("[catalog] {} tags from {}", catalog.len(), path.display());
        Ok(catalog)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label for a raw tag UID.
    pub fn resolve(&self, uid: &str) -> Result<&str, Error> {
        let ref uid = uid.trim().to_lowercase();
        self.0
            .get(uid)
            .or_else(|| self.0.get(&format!("{}{}", uid, UID_PADDING)))
            .map(String::as_str)
            .ok_or_else(|| Error::NotFound(format!("tag uid {}", uid)))
    }

    /// Card for whatever a reader sent: a known UID first, a literal label otherwise.
    pub fn identify(&self, uid_or_label: &str) -> Result<Card, Error> {
        match self.resolve(uid_or_label) {
            Ok(label) => parse(label),
            Err(missing) => parse(uid_or_label.trim()).map_err(|_| missing),
        }
    }
}

impl From<HashMap<String, String>> for Catalog {
    fn from(map: HashMap<String, String>) -> Self {
        Self(
            map.into_iter()
                .map(|(uid, label)| (uid.trim().to_lowercase(), label.trim().to_string()))
                .collect(),
        )
    }
}

/// Card named by a two character label such as `As` or `7h`.
pub fn parse(label: &str) -> Result<Card, Error> {
    Card::try_from(label)
}
