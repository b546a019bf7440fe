pub mod http;

use std::collections::HashSet;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::{HttpPageLoader, LoaderBuildError, LoaderOptions};

pub type RecordId = u64;

pub const DEFAULT_FIELDS: &[&str] = &[
    "id",
    "title",
    "place_of_origin",
    "artist_display",
    "inscriptions",
    "date_start",
    "date_end",
];

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Artwork {
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub place_of_origin: Option<String>,
    #[serde(default)]
    pub artist_display: Option<String>,
    #[serde(default)]
    pub inscriptions: Option<String>,
    #[serde(default)]
    pub date_start: Option<i64>,
    #[serde(default)]
    pub date_end: Option<i64>,
}

impl Artwork {
    pub fn new(id: RecordId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: Some(title.into()),
            place_of_origin: None,
            artist_display: None,
            inscriptions: None,
            date_start: None,
            date_end: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub total_pages: u32,
    pub current_page: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub number: u32,
    pub records: Vec<Artwork>,
    pub pagination: Pagination,
}

impl Page {
    // offset is checked against (page - 1) * limit in parse_page_body
    pub fn global_start_index(&self) -> usize {
        self.pagination.offset
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn position_of(&self, id: RecordId) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .map(|i| self.global_start_index() + i)
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.records.iter().map(|r| r.id)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid page {page}, pages are 1-indexed")]
    InvalidPage { page: u32 },

    #[error("request for page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("catalog responded with status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode page {page}: {source}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed response for page {page}: {reason}")]
    Malformed { page: u32, reason: String },
}

pub trait PageLoader {
    fn load_page(&self, page: u32) -> impl Future<Output = Result<Page, FetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct PageBody {
    pagination: Pagination,
    data: Vec<Artwork>,
}

pub fn parse_page_body(page: u32, body: &str) -> Result<Page, FetchError> {
    if page == 0 {
        return Err(FetchError::InvalidPage { page });
    }
    let decoded: PageBody =
        serde_json::from_str(body).map_err(|source| FetchError::Decode { page, source })?;
    let pagination = decoded.pagination;
    let malformed = |reason: String| FetchError::Malformed { page, reason };

    if pagination.current_page != page {
        return Err(malformed(format!(
            "current_page is {}, expected {page}",
            pagination.current_page
        )));
    }
    if pagination.limit == 0 {
        return Err(malformed("limit is 0".to_string()));
    }
    let expected_offset = (page as usize - 1)
        .checked_mul(pagination.limit)
        .ok_or_else(|| malformed(format!("limit {} overflows page offset", pagination.limit)))?;
    if pagination.offset != expected_offset {
        return Err(malformed(format!(
            "offset is {}, expected {expected_offset}",
            pagination.offset
        )));
    }
    if decoded.data.len() > pagination.limit {
        return Err(malformed(format!(
            "{} records exceed limit {}",
            decoded.data.len(),
            pagination.limit
        )));
    }
    let mut seen = HashSet::with_capacity(decoded.data.len());
    for record in decoded.data.iter() {
        if !seen.insert(record.id) {
            return Err(malformed(format!("duplicate record id {}", record.id)));
        }
    }

    Ok(Page {
        number: page,
        records: decoded.data,
        pagination,
    })
}
