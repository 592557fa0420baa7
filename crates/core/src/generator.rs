//! Synthesizes [LogRecord]s from a read-only [Vocabulary].
//!
//! Every producer owns its own [LineGenerator] and therefore its own random
//! source, so nothing here is shared mutably between threads.

use crate::{
    err::{Error, Result},
    record::{Endpoint, Level, LogRecord, Method},
};
use rand::{
    distr::{weighted::WeightedIndex, Distribution},
    rngs::SmallRng,
    seq::IndexedRandom,
    Rng,
};
use std::{borrow::Cow, net::Ipv4Addr};
use time::OffsetDateTime;

/// Candidate status codes per method. Success codes are repeated to weight
/// the draw towards them.
#[derive(Debug, Clone)]
pub struct StatusTable([Vec<u16>; Method::ALL.len()]);

impl StatusTable {
    pub fn new(
        get: Vec<u16>,
        post: Vec<u16>,
        put: Vec<u16>,
        delete: Vec<u16>,
        patch: Vec<u16>,
    ) -> Self {
        Self([get, post, put, delete, patch])
    }

    #[inline]
    pub fn candidates(&self, method: Method) -> &[u16] {
        &self.0[method as usize]
    }
}

impl Default for StatusTable {
    fn default() -> Self {
        Self::new(
            vec![200, 200, 200, 404, 500],
            vec![201, 201, 400, 500],
            vec![200, 404, 400, 500],
            vec![204, 404, 500],
            vec![200, 404, 400, 500],
        )
    }
}

/// The fake-data tables records are drawn from.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Relative weights for [Level::ALL], in order.
    pub level_weights: [u32; Level::ALL.len()],
    pub endpoints: Vec<Cow<'static, str>>,
    /// Endpoints containing any of these get a `/<id>` suffix.
    pub resource_markers: Vec<Cow<'static, str>>,
    pub status_codes: StatusTable,
    pub error_messages: Vec<Cow<'static, str>>,
    pub success_message: Cow<'static, str>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            level_weights: [70, 15, 10, 5],
            endpoints: [
                "/api/users",
                "/api/products",
                "/api/orders",
                "/api/login",
                "/api/users/profile",
                "/api/products/search",
                "/api/orders/history",
            ]
            .into_iter()
            .map(Cow::Borrowed)
            .collect(),
            resource_markers: vec![Cow::Borrowed("users"), Cow::Borrowed("orders")],
            status_codes: StatusTable::default(),
            error_messages: [
                "Database connection timeout",
                "Authentication token expired",
                "Invalid input parameters",
                "Resource not found",
                "Internal Server Error: Null pointer exception",
            ]
            .into_iter()
            .map(Cow::Borrowed)
            .collect(),
            success_message: Cow::Borrowed("Request processed successfully"),
        }
    }
}

/// Inclusive bounds used for the numeric fields.
const RESOURCE_IDS: std::ops::RangeInclusive<u16> = 1..=1000;
const FAST_RESPONSE_MS: std::ops::RangeInclusive<u32> = 20..=500;
const SLOW_RESPONSE_MS: std::ops::RangeInclusive<u32> = 500..=2000;

pub struct LineGenerator<'v> {
    vocab: &'v Vocabulary,
    levels: WeightedIndex<u32>,
    rng: SmallRng,
}

impl<'v> LineGenerator<'v> {
    pub fn new(vocab: &'v Vocabulary, rng: SmallRng) -> Result<Self> {
        let levels = WeightedIndex::new(vocab.level_weights)
            .map_err(|err| Error::Generation(format!("level weights: {err}")))?;
        Ok(Self { vocab, levels, rng })
    }

    fn pick<'a, T>(rng: &mut SmallRng, items: &'a [T], what: &str) -> Result<&'a T> {
        items
            .choose(rng)
            .ok_or_else(|| Error::Generation(format!("no {what} to choose from")))
    }

    /// Generates one record stamped with the current UTC time.
    pub fn generate(&mut self) -> Result<LogRecord> {
        let rng = &mut self.rng;

        let mut level = Level::ALL[self.levels.sample(rng)];
        let request_id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
        let source_ip = Ipv4Addr::from(rng.random::<u32>());
        let http_method = *Self::pick(rng, &Method::ALL, "http methods")?;

        let path = Self::pick(rng, &self.vocab.endpoints, "endpoints")?;
        let resource_id = self
            .vocab
            .resource_markers
            .iter()
            .any(|marker| path.contains(marker.as_ref()))
            .then(|| rng.random_range(RESOURCE_IDS));

        let status_code = *Self::pick(
            rng,
            self.vocab.status_codes.candidates(http_method),
            "status codes",
        )?;

        let (message, response_time_ms) = if status_code >= 500 {
            level = Level::Error;
            (
                Self::pick(rng, &self.vocab.error_messages, "error messages")?.clone(),
                rng.random_range(SLOW_RESPONSE_MS),
            )
        } else if status_code >= 400 {
            level = Level::Warn;
            (
                Self::pick(rng, &self.vocab.error_messages, "error messages")?.clone(),
                rng.random_range(FAST_RESPONSE_MS),
            )
        } else {
            (
                self.vocab.success_message.clone(),
                rng.random_range(FAST_RESPONSE_MS),
            )
        };

        Ok(LogRecord {
            timestamp: OffsetDateTime::now_utc(),
            level,
            request_id,
            source_ip,
            http_method,
            endpoint: Endpoint {
                path: path.clone(),
                resource_id,
            },
            status_code,
            response_time_ms,
            message,
        })
    }

    /// Fills `batch` with `count` fresh records.
    pub fn fill(&mut self, batch: &mut Vec<LogRecord>, count: usize) -> Result<()> {
        batch.reserve(count);
        for _ in 0..count {
            batch.push(self.generate()?);
        }
        Ok(())
    }
}
