//! Batch query planning and result application.
//!
//! A [`BatchPlan`] partitions requests into three lookup classes and records,
//! for each distinct lookup value, which request keys it can satisfy. Every
//! planned key lands in exactly one class or in the unresolved list.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, trace};

use crate::isbn::IsbnKind;
use crate::request::{CandidateMatch, ResolutionRequest, SeriesLink};

use super::filter;

/// Which kind of batched lookup a value is dispatched through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupClass {
    /// Case-converted title variants, matched against entity labels.
    Title,
    /// Cleaned 13-character ISBNs.
    Isbn13,
    /// Cleaned 10-character ISBNs.
    Isbn10,
}

impl LookupClass {
    /// All classes in dispatch order.
    pub const ALL: [Self; 3] = [Self::Title, Self::Isbn13, Self::Isbn10];

    /// Returns the stable label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Isbn13 => "isbn13",
            Self::Isbn10 => "isbn10",
        }
    }

    /// Returns the ISBN kind for ISBN classes.
    #[must_use]
    pub fn isbn_kind(self) -> Option<IsbnKind> {
        match self {
            Self::Title => None,
            Self::Isbn13 => Some(IsbnKind::Isbn13),
            Self::Isbn10 => Some(IsbnKind::Isbn10),
        }
    }
}

impl From<IsbnKind> for LookupClass {
    fn from(kind: IsbnKind) -> Self {
        match kind {
            IsbnKind::Isbn13 => Self::Isbn13,
            IsbnKind::Isbn10 => Self::Isbn10,
        }
    }
}

impl fmt::Display for LookupClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw result row attributed to the lookup value that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResult {
    /// Class of the lookup that produced the row.
    pub class: LookupClass,
    /// Lookup value the row answers.
    pub value: String,
    /// The unfiltered candidate.
    pub candidate: CandidateMatch,
}

/// Lookup values and reverse map for one class.
#[derive(Debug, Clone)]
pub struct LookupGroup {
    class: LookupClass,
    /// Distinct lookup values in first-seen order.
    values: Vec<String>,
    /// Lowercased lookup value to originating request keys.
    reverse: HashMap<String, Vec<String>>,
    /// Cleaned ISBN to the spellings it is queried under.
    spellings: HashMap<String, Vec<String>>,
}

impl LookupGroup {
    fn new(class: LookupClass) -> Self {
        Self {
            class,
            values: Vec::new(),
            reverse: HashMap::new(),
            spellings: HashMap::new(),
        }
    }

    fn add(&mut self, value: &str, key: &str) {
        let folded = value.to_lowercase();
        let keys = self.reverse.entry(folded).or_insert_with(|| {
            self.values.push(value.to_string());
            Vec::new()
        });
        if !keys.iter().any(|existing| existing == key) {
            keys.push(key.to_string());
        }
    }

    fn add_spelling(&mut self, value: &str, spelling: &str) {
        let spellings = self
            .spellings
            .entry(value.to_string())
            .or_insert_with(|| vec![value.to_string()]);
        if !spellings.iter().any(|existing| existing == spelling) {
            spellings.push(spelling.to_string());
        }
    }

    /// Returns the class of this group.
    #[must_use]
    pub fn class(&self) -> LookupClass {
        self.class
    }

    /// Returns the distinct lookup values in first-seen order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Returns the request keys a match on `value` satisfies.
    #[must_use]
    pub fn keys_for(&self, value: &str) -> &[String] {
        self.reverse
            .get(&value.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the spellings an ISBN value is queried under, cleaned form first.
    #[must_use]
    pub fn spellings_for(&self, value: &str) -> Vec<String> {
        self.spellings
            .get(value)
            .cloned()
            .unwrap_or_else(|| vec![value.to_string()])
    }

    /// Returns true when the group has no lookup values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns true when `key` appears in this group's reverse map.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.reverse
            .values()
            .any(|keys| keys.iter().any(|k| k == key))
    }
}

/// The planner's partition of one batch of requests.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    title: LookupGroup,
    isbn13: LookupGroup,
    isbn10: LookupGroup,
    /// Keys with neither a usable title nor a well-formed ISBN.
    unresolved: Vec<String>,
    /// Class each dispatched key was planned into.
    classes: HashMap<String, LookupClass>,
}

impl BatchPlan {
    /// Returns the group for `class`.
    #[must_use]
    pub fn group(&self, class: LookupClass) -> &LookupGroup {
        match class {
            LookupClass::Title => &self.title,
            LookupClass::Isbn13 => &self.isbn13,
            LookupClass::Isbn10 => &self.isbn10,
        }
    }

    fn group_mut(&mut self, class: LookupClass) -> &mut LookupGroup {
        match class {
            LookupClass::Title => &mut self.title,
            LookupClass::Isbn13 => &mut self.isbn13,
            LookupClass::Isbn10 => &mut self.isbn10,
        }
    }

    /// Returns the non-empty groups in dispatch order.
    pub fn groups(&self) -> impl Iterator<Item = &LookupGroup> {
        LookupClass::ALL
            .into_iter()
            .map(|class| self.group(class))
            .filter(|group| !group.is_empty())
    }

    /// Keys recorded as immediately unresolved.
    #[must_use]
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// Returns the class `key` was planned into, if it was dispatched.
    #[must_use]
    pub fn class_of(&self, key: &str) -> Option<LookupClass> {
        self.classes.get(key).copied()
    }

    /// Total distinct lookup values across classes.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        LookupClass::ALL
            .into_iter()
            .map(|class| self.group(class).values.len())
            .sum()
    }

    /// Returns true when nothing needs dispatching.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup_count() == 0
    }
}

/// Partitions `requests` into lookup classes.
///
/// A request with a well-formed ISBN is planned into that ISBN's class;
/// otherwise its title variants go into the title class. Requests with
/// neither are recorded as unresolved.
#[must_use]
pub fn plan(requests: &[ResolutionRequest]) -> BatchPlan {
    let mut plan = BatchPlan {
        title: LookupGroup::new(LookupClass::Title),
        isbn13: LookupGroup::new(LookupClass::Isbn13),
        isbn10: LookupGroup::new(LookupClass::Isbn10),
        unresolved: Vec::new(),
        classes: HashMap::new(),
    };

    for request in requests {
        if let Some(isbn) = request.clean_isbn() {
            let class = LookupClass::from(isbn.kind());
            let group = plan.group_mut(class);
            group.add(isbn.as_str(), &request.key);
            if let Some(raw) = request.isbn.as_deref() {
                group.add_spelling(isbn.as_str(), raw.trim());
            }
            plan.classes.insert(request.key.clone(), class);
            trace!(key = %request.key, class = %class, "planned ISBN lookup");
            continue;
        }

        let title = request.normalized_title();
        if title.is_usable() {
            for variant in &title.variants {
                plan.title.add(variant, &request.key);
            }
            plan.classes.insert(request.key.clone(), LookupClass::Title);
            trace!(key = %request.key, variants = title.variants.len(), "planned title lookup");
        } else if !plan.unresolved.contains(&request.key) {
            plan.unresolved.push(request.key.clone());
        }
    }

    debug!(
        titles = plan.title.values.len(),
        isbn13 = plan.isbn13.values.len(),
        isbn10 = plan.isbn10.values.len(),
        unresolved = plan.unresolved.len(),
        "built batch plan"
    );
    plan
}

/// Maps raw results back to request keys.
///
/// Every key in the plan appears in the output. Each raw result runs through
/// the confidence filter and is assigned to every originating key that has
/// no link yet; later results for an already linked key are discarded.
#[must_use]
pub fn apply_results(
    plan: &BatchPlan,
    raw_results: &[RawResult],
) -> HashMap<String, Option<SeriesLink>> {
    let mut resolved: HashMap<String, Option<SeriesLink>> = plan
        .classes
        .keys()
        .chain(plan.unresolved.iter())
        .map(|key| (key.clone(), None))
        .collect();

    let mut linked: HashSet<&str> = HashSet::new();
    for raw in raw_results {
        let keys = plan.group(raw.class).keys_for(&raw.value);
        if keys.is_empty() {
            trace!(class = %raw.class, value = %raw.value, "result for unknown lookup value");
            continue;
        }
        if keys.iter().all(|key| linked.contains(key.as_str())) {
            continue;
        }
        let Some(link) = filter::accept(&raw.candidate) else {
            continue;
        };
        for key in keys {
            if linked.insert(key.as_str()) {
                debug!(key = %key, series = %link.series_name, "resolved from batch");
                resolved.insert(key.clone(), Some(link.clone()));
            }
        }
    }
    resolved
}
