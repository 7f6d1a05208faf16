//! Session controller — the Live/Historical state machine.
//!
//! The session owns the stream transport, the query client, and the live
//! buffer, and is the only writer of the displayed-sequence selection. All
//! asynchronous completions (stream entries, connection-state changes, query
//! results) funnel through one event pump, [`Session::next_update`], so the
//! staleness guard is enforced in a single place.
//!
//! Mode rules:
//!
//! - entering Live clears the buffer and its counter and ensures the
//!   transport is connected; the buffer becomes the displayed sequence.
//! - entering Historical leaves the buffer intact (hidden) and issues a
//!   fresh query. By default the transport stays connected so Live re-entry
//!   is warm; with `keep_warm_in_historical = false` it disconnects instead.
//! - stream entries arriving in Historical are still admitted to the buffer,
//!   but never touch the displayed historical page.
//! - filter changes in Live affect only future admissions; entries already
//!   admitted under the old filter stay.
//!
//! In-flight queries are never cancelled at the transport level; a ticket
//! comparison discards any response that is not from the most recently
//! issued request.

use crate::error::QueryError;
use crate::query::QueryClient;
use crate::transport::{ConnectionState, StreamTransport};
use tailview_core::config::Config;
use tailview_core::{FilterCriteria, LiveBuffer, LogEntry, Page, Pagination};
use tokio::sync::{mpsc, watch};

/// Which buffer is authoritative for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Display driven by the continuously-arriving stream buffer.
    Live,
    /// Display driven by discrete paged queries against stored data.
    Historical,
}

/// What changed, as reported by the event pump. The caller re-reads session
/// accessors for the details.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// The displayed sequence changed.
    Display,
    /// The stream transport changed connection state.
    Connection(ConnectionState),
    /// A historical query failed; the displayed sequence was cleared.
    QueryFailed(String),
}

struct QueryOutcome {
    ticket: u64,
    result: Result<Page, QueryError>,
}

pub struct Session {
    mode: ViewMode,
    filter: FilterCriteria,
    pagination: Pagination,
    buffer: LiveBuffer,
    historical: Vec<LogEntry>,
    services: Vec<String>,
    keep_warm: bool,

    transport: StreamTransport,
    entries: mpsc::UnboundedReceiver<LogEntry>,
    connection: watch::Receiver<ConnectionState>,

    query: QueryClient,
    /// Ticket of the most recently issued historical query. Only a response
    /// carrying this exact ticket may update anything.
    latest_ticket: u64,
    outcomes_tx: mpsc::UnboundedSender<QueryOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<QueryOutcome>,
}

impl Session {
    /// Build a session and enter `mode`. Must run inside a tokio runtime —
    /// the transport actor is spawned here. Live starts connecting
    /// immediately; Historical issues its first query immediately.
    pub fn new(config: &Config, mode: ViewMode) -> Self {
        let (transport, entries) = StreamTransport::spawn(config.stream.clone());
        let connection = transport.state_changes();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        let mut pagination = Pagination::default();
        pagination.set_size(config.query.page_size);

        let mut session = Self {
            mode,
            filter: FilterCriteria {
                env: Some(config.query.default_env.clone()),
                ..FilterCriteria::default()
            },
            pagination,
            buffer: LiveBuffer::new(config.live.capacity),
            historical: Vec::new(),
            services: Vec::new(),
            keep_warm: config.stream.keep_warm_in_historical,
            transport,
            entries,
            connection,
            query: QueryClient::new(&config.api),
            latest_ticket: 0,
            outcomes_tx,
            outcomes_rx,
        };

        match mode {
            ViewMode::Live => session.transport.connect(),
            ViewMode::Historical => session.refresh(),
        }
        session
    }

    // -- Accessors ----------------------------------------------------------

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn filter(&self) -> &FilterCriteria {
        &self.filter
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn connection(&self) -> ConnectionState {
        self.transport.state()
    }

    /// The authoritative sequence for the current mode, newest first in
    /// Live, server order in Historical.
    pub fn displayed(&self) -> &[LogEntry] {
        match self.mode {
            ViewMode::Live => self.buffer.entries(),
            ViewMode::Historical => &self.historical,
        }
    }

    /// Entries admitted to the live buffer since it was last cleared.
    pub fn live_received(&self) -> u64 {
        self.buffer.received()
    }

    pub fn live_len(&self) -> usize {
        self.buffer.len()
    }

    /// Service names loaded for the active environment.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Case-insensitive substring filter over the loaded service list, for
    /// the surrounding UI's sidebar.
    pub fn filter_services(&self, needle: &str) -> Vec<&str> {
        let needle = needle.to_lowercase();
        self.services
            .iter()
            .filter(|s| s.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    // -- Mode & criteria ----------------------------------------------------

    /// Switch view mode. Re-entering the current mode is a no-op.
    pub fn set_mode(&mut self, mode: ViewMode) {
        if mode == self.mode {
            return;
        }
        tracing::debug!(from = ?self.mode, to = ?mode, "view mode");
        self.mode = mode;
        match mode {
            ViewMode::Live => {
                self.buffer.clear();
                self.transport.connect();
            }
            ViewMode::Historical => {
                if !self.keep_warm {
                    self.transport.disconnect();
                }
                self.refresh();
            }
        }
    }

    /// Replace the filter criteria. In Historical mode any change resets to
    /// page 1 and re-queries; in Live mode it affects only entries admitted
    /// from here on.
    pub fn set_filter(&mut self, filter: FilterCriteria) {
        let filter = filter.normalized();
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        if self.mode == ViewMode::Historical {
            self.pagination.reset();
            self.refresh();
        }
    }

    /// Jump to a page, keeping all other criteria. Queries in Historical
    /// mode only.
    pub fn set_page(&mut self, page: usize) {
        self.pagination.set_page(page);
        if self.mode == ViewMode::Historical {
            self.refresh();
        }
    }

    /// Change the page size (resets to page 1), keeping all other criteria.
    pub fn set_page_size(&mut self, size: usize) {
        self.pagination.set_size(size);
        if self.mode == ViewMode::Historical {
            self.refresh();
        }
    }

    pub fn set_live_capacity(&mut self, capacity: usize) {
        self.buffer.set_capacity(capacity);
    }

    // -- Queries ------------------------------------------------------------

    /// Issue a historical query with the current criteria and pagination.
    /// The response is applied by the event pump, and only if no newer query
    /// has been issued by the time it arrives.
    pub fn refresh(&mut self) {
        self.latest_ticket += 1;
        let ticket = self.latest_ticket;
        let client = self.query.clone();
        let filter = self.filter.clone();
        let pagination = self.pagination;
        let outcomes = self.outcomes_tx.clone();
        tracing::debug!(ticket, page = pagination.page(), "issuing historical query");
        tokio::spawn(async move {
            let result = client.search(&filter, &pagination).await;
            let _ = outcomes.send(QueryOutcome { ticket, result });
        });
    }

    /// Fetch the service list for the active environment. On failure the
    /// cached list is cleared and the error returned.
    pub async fn load_services(&mut self) -> Result<&[String], QueryError> {
        match self.query.services(self.filter.env.as_deref()).await {
            Ok(list) => {
                self.services = list;
                Ok(&self.services)
            }
            Err(err) => {
                self.services.clear();
                Err(err)
            }
        }
    }

    /// Direct access to the query client for surfaces the session does not
    /// mediate (export, ingest, retention, stats).
    pub fn query_client(&self) -> &QueryClient {
        &self.query
    }

    // -- Event pump ---------------------------------------------------------

    /// Wait for the next observable change. Returns `None` once the
    /// transport actor is gone (session shutdown).
    ///
    /// Everything that arrives here runs to completion before the next event
    /// is taken, so no interleaving can violate the staleness guard.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            tokio::select! {
                entry = self.entries.recv() => match entry {
                    None => return None,
                    Some(entry) => {
                        let admitted = self.buffer.admit(entry, &self.filter);
                        // In Historical the buffer stays warm but the
                        // displayed page is untouched.
                        if admitted && self.mode == ViewMode::Live {
                            return Some(SessionUpdate::Display);
                        }
                    }
                },
                changed = self.connection.changed() => match changed {
                    Err(_) => return None,
                    Ok(()) => {
                        let state = *self.connection.borrow_and_update();
                        return Some(SessionUpdate::Connection(state));
                    }
                },
                outcome = self.outcomes_rx.recv() => {
                    // recv cannot yield None: the session holds a sender.
                    let Some(QueryOutcome { ticket, result }) = outcome else { continue };
                    if ticket != self.latest_ticket {
                        tracing::debug!(ticket, latest = self.latest_ticket, "discarding stale query response");
                        continue;
                    }
                    match result {
                        Ok(page) => {
                            self.pagination.total = page.total;
                            self.historical = page.items;
                            if self.mode == ViewMode::Historical {
                                return Some(SessionUpdate::Display);
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "historical query failed");
                            self.historical.clear();
                            return Some(SessionUpdate::QueryFailed(err.to_string()));
                        }
                    }
                },
            }
        }
    }
}
