use std::fmt;

use ordinal_core::ItemKey;

/// Cache key for one item: `item:{id}:{scope}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn item(key: ItemKey) -> Self {
        Self(format!("item:{}:{}", key.id, key.scope))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ItemKey> for CacheKey {
    fn from(key: ItemKey) -> Self {
        Self::item(key)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_combines_id_and_scope() {
        assert_eq!(CacheKey::item(ItemKey::new(12, 3)).as_str(), "item:12:3");
        assert_ne!(
            CacheKey::from(ItemKey::new(1, 2)),
            CacheKey::from(ItemKey::new(2, 1))
        );
    }
}
