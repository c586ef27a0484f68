//! Catalog building and lookup.
//!
//! A catalog build enumerates every document of a [`DocumentSource`], parses
//! each one independently and aggregates the results:
//!
//! ```text
//! list()  →  par_iter: read + parse (or cache hit)  →  in discovery order:
//!            drop failures, reject duplicate ids  →  filter published  →
//!            stable sort by gateway
//! ```
//!
//! ## Failure Isolation
//!
//! A document that can't be read or parsed is reported in
//! [`CatalogBuild::failures`] and left out; the rest of the build carries on.
//! Only a failure to *enumerate* documents aborts the build.
//!
//! ## Parallelism
//!
//! Documents share no state, so they are parsed with rayon's `par_iter`. The
//! indexed collect keeps results in discovery order, which is what the stable
//! gateway sort uses to break ties. Builds are idempotent: abandoning one
//! midway leaves nothing to clean up.

use crate::cache::{CacheStats, ParseCache, hash_document};
use crate::frontmatter::DocumentParseError;
use crate::parser::parse_document;
use crate::source::{DocumentSource, SourceError};
use crate::types::{MIN_GATEWAY, ParsedCourse};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot enumerate documents: {0}")]
    Source(#[from] SourceError),
}

/// Why one document was left out of the catalog.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] DocumentParseError),
}

/// A document excluded from the catalog, with the reason.
#[derive(Debug)]
pub struct DocumentFailure {
    pub name: String,
    pub error: DocumentError,
}

/// The rung below a course on the gateway ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite<'a> {
    /// First gateway: always open.
    None,
    /// Must be completed first.
    Course(&'a ParsedCourse),
    /// No course in the catalog sits on `gateway`.
    Missing { gateway: u8 },
}

impl<'a> Prerequisite<'a> {
    pub fn course(self) -> Option<&'a ParsedCourse> {
        match self {
            Self::Course(course) => Some(course),
            Self::None | Self::Missing { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogOptions {
    /// Keep `published: false` courses (author preview).
    pub include_unpublished: bool,
}

/// Published courses, ordered by gateway.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    courses: Vec<ParsedCourse>,
}

impl Catalog {
    /// Filter and order already-parsed courses.
    ///
    /// The sort is stable, so courses sharing a gateway keep the order they
    /// were given in.
    pub fn from_courses(courses: Vec<ParsedCourse>, options: CatalogOptions) -> Self {
        let mut courses: Vec<ParsedCourse> = courses
            .into_iter()
            .filter(|c| options.include_unpublished || c.metadata.published)
            .collect();
        courses.sort_by_key(|c| c.metadata.gateway);
        Self { courses }
    }

    pub fn get_all_courses(&self) -> &[ParsedCourse] {
        &self.courses
    }

    pub fn get_course_content(&self, id: &str) -> Option<&ParsedCourse> {
        self.courses.iter().find(|c| c.id() == id)
    }

    /// What a learner must finish before `course` unlocks.
    ///
    /// Gateway `g` waits on the first course of gateway `g - 1`. A gap in
    /// the ladder is [`Prerequisite::Missing`]: the course stays locked
    /// until the rung below it is filled.
    pub fn prerequisite(&self, course: &ParsedCourse) -> Prerequisite<'_> {
        let gateway = course.metadata.gateway;
        if gateway <= MIN_GATEWAY {
            return Prerequisite::None;
        }
        let below = gateway - 1;
        match self.courses.iter().find(|c| c.metadata.gateway == below) {
            Some(course) => Prerequisite::Course(course),
            None => Prerequisite::Missing { gateway: below },
        }
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

/// Result of a catalog build.
#[derive(Debug)]
pub struct CatalogBuild {
    pub catalog: Catalog,
    /// Documents excluded because they failed, in discovery order.
    pub failures: Vec<DocumentFailure>,
    /// Names of the documents that parsed, paired with their course ids.
    pub documents: Vec<(String, String)>,
    /// Parsed courses dropped by the published filter.
    pub unpublished: usize,
    pub cache_stats: CacheStats,
}

enum Loaded {
    Cached { hash: String, course: ParsedCourse },
    Parsed { hash: String, course: ParsedCourse },
    Failed(DocumentError),
}

fn load_document<S: DocumentSource + ?Sized>(
    source: &S,
    name: &str,
    cache: Option<&ParseCache>,
) -> Loaded {
    let text = match source.read(name) {
        Ok(t) => t,
        Err(e) => return Loaded::Failed(e.into()),
    };
    let hash = hash_document(&text);
    if let Some(course) = cache.and_then(|c| c.get(&hash)) {
        debug!(document = name, "parse cache hit");
        return Loaded::Cached {
            hash,
            course: course.clone(),
        };
    }
    match parse_document(&text) {
        Ok(course) => {
            debug!(
                document = name,
                id = course.id(),
                chapters = course.total_chapters(),
                slides = course.total_slides(),
                "parsed course document"
            );
            Loaded::Parsed { hash, course }
        }
        Err(e) => Loaded::Failed(e.into()),
    }
}

/// Build the catalog from every document of `source`.
///
/// When a cache is given, unchanged documents are served from it and the
/// cache is updated with fresh results and pruned of dead entries.
pub fn build_catalog<S: DocumentSource + ?Sized>(
    source: &S,
    options: CatalogOptions,
    mut cache: Option<&mut ParseCache>,
) -> Result<CatalogBuild, CatalogError> {
    let names = source.list()?;

    let loaded: Vec<Loaded> = {
        let lookup = cache.as_deref();
        names
            .par_iter()
            .map(|name| load_document(source, name, lookup))
            .collect()
    };

    let mut stats = CacheStats::default();
    let mut seen_ids = HashSet::new();
    let mut live_hashes = HashSet::new();
    let mut fresh = Vec::new();
    let mut courses = Vec::new();
    let mut documents = Vec::new();
    let mut failures = Vec::new();

    for (name, outcome) in names.into_iter().zip(loaded) {
        let (hash, course) = match outcome {
            Loaded::Cached { hash, course } => {
                stats.hit();
                (hash, course)
            }
            Loaded::Parsed { hash, course } => {
                stats.miss();
                fresh.push((hash.clone(), course.clone()));
                (hash, course)
            }
            Loaded::Failed(error) => {
                warn!(document = %name, error = %error, "document excluded from catalog");
                failures.push(DocumentFailure { name, error });
                continue;
            }
        };
        live_hashes.insert(hash);

        if !seen_ids.insert(course.id().to_string()) {
            let error = DocumentParseError::DuplicateId(course.id().to_string());
            warn!(document = %name, error = %error, "document excluded from catalog");
            failures.push(DocumentFailure {
                name,
                error: error.into(),
            });
            continue;
        }

        for warning in &course.warnings {
            warn!(document = %name, "{warning}");
        }
        documents.push((name, course.id().to_string()));
        courses.push(course);
    }

    if let Some(cache) = cache.as_deref_mut() {
        for (hash, course) in fresh {
            cache.insert(hash, course);
        }
        cache.retain(&live_hashes);
    }

    let parsed = courses.len();
    let catalog = Catalog::from_courses(courses, options);
    let unpublished = parsed - catalog.len();
    info!(
        courses = catalog.len(),
        unpublished,
        failed = failures.len(),
        cache = %stats,
        "catalog built"
    );

    Ok(CatalogBuild {
        catalog,
        failures,
        documents,
        unpublished,
        cache_stats: stats,
    })
}
