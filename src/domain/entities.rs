//! Core entities for URL rewrite reconciliation
//!
//! Ids, entity kinds and the descriptor that tells the reconciler where a
//! kind's live ids come from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a catalog entity (category or product)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Best-effort integer conversion for untrusted input.
    ///
    /// Skips leading whitespace, reads an optional sign and the leading run of
    /// digits and ignores the rest. A leading number in exponent notation
    /// (`1e3`, `1.5e3`) is read as a float and truncated toward zero. Input
    /// without leading digits becomes `0`, out-of-range values saturate.
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        let (negative, rest) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (integer, after_integer) = rest.split_at(leading_digits(rest));
        let (fraction, after_mantissa) = match after_integer.strip_prefix('.') {
            Some(tail) => tail.split_at(leading_digits(tail)),
            None => ("", after_integer),
        };

        if !integer.is_empty() || !fraction.is_empty() {
            if let Some(exponent) = exponent_suffix(after_mantissa) {
                return Self::from_float_literal(negative, integer, fraction, exponent);
            }
        }

        let mut value: i64 = 0;
        for byte in integer.bytes() {
            let digit = i64::from(byte - b'0');
            value = if negative {
                value.saturating_mul(10).saturating_sub(digit)
            } else {
                value.saturating_mul(10).saturating_add(digit)
            };
        }

        Self(value)
    }

    // `as` saturates on overflow and maps NaN to 0
    #[allow(clippy::cast_possible_truncation)]
    fn from_float_literal(negative: bool, integer: &str, fraction: &str, exponent: &str) -> Self {
        let literal = format!(
            "{}{}.{}e{}",
            if negative { "-" } else { "" },
            if integer.is_empty() { "0" } else { integer },
            if fraction.is_empty() { "0" } else { fraction },
            exponent
        );
        Self(literal.parse::<f64>().map_or(0, |value| value as i64))
    }
}

fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// Signed digits of an `e`/`E` exponent at the start of `s`
fn exponent_suffix(s: &str) -> Option<&str> {
    let tail = s.strip_prefix(['e', 'E'])?;
    let sign = usize::from(tail.starts_with(['+', '-']));
    let digits = leading_digits(&tail[sign..]);
    (digits > 0).then(|| &tail[..sign + digits])
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stored URL rewrite row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewriteId(i64);

impl RewriteId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for RewriteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RewriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown entity kind '{0}' (expected 'category' or 'product')")]
pub struct KindParseError(String);

/// Catalog entity kind that owns a rewrite row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Product,
}

impl EntityKind {
    pub const ALL: [Self; 2] = [Self::Category, Self::Product];

    /// Value stored in the rewrite table's `entity_type` column
    #[must_use]
    pub const fn discriminator(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Product => "product",
        }
    }

    #[must_use]
    pub const fn default_entity_table(self) -> &'static str {
        match self {
            Self::Category => "catalog_category_entity",
            Self::Product => "catalog_product_entity",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.discriminator())
    }
}

impl FromStr for EntityKind {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.discriminator().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KindParseError(s.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid SQL identifier '{0}'")]
pub struct IdentifierError(String);

/// Table or column name that is safe to splice into SQL text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SqlIdentifier(String);

impl SqlIdentifier {
    pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(Self(name))
        } else {
            Err(IdentifierError(name))
        }
    }

    /// Built-in names that are known to be valid
    pub(crate) fn trusted(name: &'static str) -> Self {
        debug_assert!(Self::new(name).is_ok(), "invalid built-in identifier {name}");
        Self(name.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SqlIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SqlIdentifier> for String {
    fn from(value: SqlIdentifier) -> Self {
        value.0
    }
}

impl fmt::Display for SqlIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the live ids of one entity kind are read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKindDescriptor {
    pub kind: EntityKind,
    pub entity_table: SqlIdentifier,
    /// Column rewrite rows reference; `row_id` on staged-content catalogs
    pub link_field: SqlIdentifier,
}

impl EntityKindDescriptor {
    pub fn new(
        kind: EntityKind,
        entity_table: &str,
        link_field: &str,
    ) -> Result<Self, IdentifierError> {
        Ok(Self {
            kind,
            entity_table: SqlIdentifier::new(entity_table)?,
            link_field: SqlIdentifier::new(link_field)?,
        })
    }

    #[must_use]
    pub fn default_for(kind: EntityKind) -> Self {
        Self {
            kind,
            entity_table: SqlIdentifier::trusted(kind.default_entity_table()),
            link_field: SqlIdentifier::trusted("entity_id"),
        }
    }
}

/// A generated URL path mapping pointing at a catalog entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRecord {
    pub rewrite_id: RewriteId,
    pub entity_id: EntityId,
    pub entity_kind: EntityKind,
    pub request_path: String,
    pub target_path: String,
}

impl RewriteRecord {
    /// Record with paths derived from the entity, enough for seeding stores
    #[must_use]
    pub fn for_entity(rewrite_id: i64, kind: EntityKind, entity_id: i64) -> Self {
        Self {
            rewrite_id: RewriteId::new(rewrite_id),
            entity_id: EntityId::new(entity_id),
            entity_kind: kind,
            request_path: format!("{kind}-{entity_id}.html"),
            target_path: format!("catalog/{kind}/view/id/{entity_id}"),
        }
    }
}

/// Which entities a reconciliation run considers live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationRequest {
    /// Every entity of the kind
    Full,
    /// Only the given candidate ids; never empty
    Scoped(BTreeSet<EntityId>),
}

impl ReconciliationRequest {
    /// Scoped request over `ids`, or `Full` when `ids` is empty
    pub fn list(ids: impl IntoIterator<Item = EntityId>) -> Self {
        let ids: BTreeSet<EntityId> = ids.into_iter().collect();
        if ids.is_empty() {
            Self::Full
        } else {
            Self::Scoped(ids)
        }
    }

    #[must_use]
    pub fn row(id: EntityId) -> Self {
        Self::Scoped(BTreeSet::from([id]))
    }

    /// Like [`Self::list`], coercing each raw value with [`EntityId::coerce`]
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::list(raw.into_iter().map(|value| EntityId::coerce(value.as_ref())))
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&BTreeSet<EntityId>> {
        match self {
            Self::Full => None,
            Self::Scoped(ids) => Some(ids),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> ReconcileMode {
        match self {
            Self::Full => ReconcileMode::Full,
            Self::Scoped(_) => ReconcileMode::Scoped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    Full,
    Scoped,
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Scoped => f.write_str("scoped"),
        }
    }
}

/// Outcome of a single reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub kind: EntityKind,
    pub mode: ReconcileMode,
    pub candidate_ids: usize,
    pub live_ids: usize,
    pub orphaned: usize,
    pub deleted: u64,
    pub batches: usize,
}

impl ReconcileReport {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.batches == 0
    }
}
