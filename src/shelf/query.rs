use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use secrecy::ExposeSecret;

use crate::shelf::models::CredentialRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    VendorAsc,
    VendorDesc,
    Tag,
    DateAsc,
    DateDesc,
    /// Unrecognised keys keep input order.
    Unsorted,
}

impl SortKey {
    pub const CYCLE: [SortKey; 5] = [
        SortKey::VendorAsc,
        SortKey::VendorDesc,
        SortKey::Tag,
        SortKey::DateDesc,
        SortKey::DateAsc,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "vendor-asc" => SortKey::VendorAsc,
            "vendor-desc" => SortKey::VendorDesc,
            "tag" => SortKey::Tag,
            "date-asc" => SortKey::DateAsc,
            "date-desc" => SortKey::DateDesc,
            _ => SortKey::Unsorted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::VendorAsc => "vendor-asc",
            SortKey::VendorDesc => "vendor-desc",
            SortKey::Tag => "tag",
            SortKey::DateAsc => "date-asc",
            SortKey::DateDesc => "date-desc",
            SortKey::Unsorted => "unsorted",
        }
    }

    pub fn next(self) -> Self {
        let pos = Self::CYCLE.iter().position(|k| *k == self).unwrap_or(0);
        Self::CYCLE[(pos + 1) % Self::CYCLE.len()]
    }

    fn compare(&self, a: &CredentialRecord, b: &CredentialRecord) -> Ordering {
        match self {
            SortKey::VendorAsc => locale_cmp(&a.vendor, &b.vendor),
            SortKey::VendorDesc => locale_cmp(&b.vendor, &a.vendor),
            SortKey::Tag => locale_cmp(&a.tag, &b.tag),
            SortKey::DateAsc => a.created_instant().cmp(&b.created_instant()),
            SortKey::DateDesc => b.created_instant().cmp(&a.created_instant()),
            SortKey::Unsorted => Ordering::Equal,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `tag:<name>` selects tag ordering plus an exact tag filter; anything else
/// is a plain sort key.
pub fn parse_sort_selection(raw: &str) -> (SortKey, Option<String>) {
    match raw.strip_prefix("tag:") {
        Some(tag) => (SortKey::Tag, Some(tag.to_string())),
        None => (SortKey::parse(raw), None),
    }
}

/// Search, tag filter and ordering applied to a record list.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub search: String,
    pub sort: SortKey,
    pub tag: Option<String>,
}

impl Query {
    /// Filter, then stable-sort.
    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a CredentialRecord>
    where
        I: IntoIterator<Item = &'a CredentialRecord>,
    {
        let term = self.search.to_lowercase();
        let mut out: Vec<&CredentialRecord> = records
            .into_iter()
            .filter(|r| matches_search(r, &term))
            .filter(|r| self.tag.as_deref().map_or(true, |t| matches_tag(r, t)))
            .collect();
        out.sort_by(|a, b| self.sort.compare(a, b));
        out
    }
}

pub fn query<'a, I>(
    records: I,
    search: &str,
    sort: SortKey,
    tag: Option<&str>,
) -> Vec<&'a CredentialRecord>
where
    I: IntoIterator<Item = &'a CredentialRecord>,
{
    Query {
        search: search.to_string(),
        sort,
        tag: tag.map(str::to_string),
    }
    .apply(records)
}

/// `term` must already be lower-cased. Checked in order: standard fields,
/// custom fields, the serialized imported payload.
fn matches_search(record: &CredentialRecord, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let hit = |s: &str| s.to_lowercase().contains(term);
    if hit(&record.vendor)
        || hit(&record.account)
        || hit(&record.tag)
        || hit(record.api_key.expose_secret())
    {
        return true;
    }
    if let Some(fields) = &record.custom_fields {
        if fields.iter().any(|(k, v)| hit(k) || hit(v)) {
            return true;
        }
    }
    match record.payload() {
        Some(p) => serde_json::to_string(&p.tree).is_ok_and(|text| hit(&text)),
        None => false,
    }
}

/// Exact, case-sensitive equality against a trimmed tag token.
pub fn matches_tag(record: &CredentialRecord, tag: &str) -> bool {
    record.tags().any(|t| t == tag)
}

/// Distinct tag tokens across all records, sorted.
pub fn all_tags(records: &[CredentialRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|r| r.tags())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive primary order; on ties lower case sorts before upper case.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let fold = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
    fold(a).cmp(&fold(b)).then_with(|| {
        let rank = |c: char| (u8::from(!c.is_lowercase()), c);
        a.chars().map(rank).cmp(b.chars().map(rank))
    })
}
