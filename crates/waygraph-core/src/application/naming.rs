//! Sequential node names such as `Site0001`.

/// Numeric part of `name` when it is `prefix` followed only by digits
pub fn numeric_suffix(prefix: &str, name: &str) -> Option<u64> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Hands out node names above the highest suffix already in use.
///
/// Numbers past the padding width simply grow wider (`Site10000`).
#[derive(Debug, Clone)]
pub struct NodeNamer {
    prefix: String,
    digits: usize,
    next: u64,
}

impl NodeNamer {
    /// Start after the highest numeric suffix among `existing`
    pub fn from_existing<'a>(
        prefix: impl Into<String>,
        digits: usize,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let prefix = prefix.into();
        let highest = existing
            .into_iter()
            .filter_map(|name| numeric_suffix(&prefix, name))
            .max()
            .unwrap_or(0);
        Self {
            prefix,
            digits,
            next: highest.saturating_add(1),
        }
    }

    /// Record a name chosen elsewhere so later names stay above it
    pub fn observe(&mut self, name: &str) {
        if let Some(n) = numeric_suffix(&self.prefix, name) {
            self.next = self.next.max(n.saturating_add(1));
        }
    }

    /// Name the next node
    pub fn next_name(&mut self) -> String {
        let name = format!("{}{:0width$}", self.prefix, self.next, width = self.digits);
        self.next = self.next.saturating_add(1);
        name
    }
}
