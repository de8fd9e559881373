use adapter::ApiError;
use domain::{CommentPage, Cursor, PageQuery, Sort, SortBy};
use tracing::{debug, info, warn};

use crate::{Diagnostic, ViewModel};

/// A list request handed to the transport. `seq` identifies it when the
/// response comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub seq: u64,
    pub query: PageQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Replaced { roots: usize },
    Stale,
    Failed,
}

impl ViewModel {
    pub fn request_page(&mut self, page: u32) -> PageRequest {
        self.issue(PageQuery {
            page: page.max(1),
            sort: self.requested.sort,
        })
    }

    pub fn request_next_page(&mut self) -> Option<PageRequest> {
        self.cursor
            .has_next()
            .then(|| self.cursor.page + 1)
            .map(|p| self.request_page(p))
    }

    pub fn request_prev_page(&mut self) -> Option<PageRequest> {
        self.cursor
            .has_prev()
            .then(|| self.cursor.page - 1)
            .map(|p| self.request_page(p))
    }

    /// Sorting keeps the page; picking the active field again flips the order.
    pub fn request_sort(&mut self, by: SortBy) -> PageRequest {
        let sort = Sort::toggle(self.requested.sort, by);
        self.issue(PageQuery {
            page: self.requested.page,
            sort: Some(sort),
        })
    }

    pub fn request_refresh(&mut self) -> PageRequest {
        self.issue(self.cursor.query())
    }

    fn issue(&mut self, query: PageQuery) -> PageRequest {
        self.latest_load += 1;
        self.requested = query;
        debug!("Issuing load #{}: {:?}", self.latest_load, query);
        PageRequest {
            seq: self.latest_load,
            query,
        }
    }

    /// Replaces the whole forest with the server's page. Only the response to
    /// the most recently issued request is applied.
    pub fn apply_page(
        &mut self,
        req: PageRequest,
        result: Result<CommentPage, ApiError>,
    ) -> LoadOutcome {
        if req.seq != self.latest_load {
            self.record(Diagnostic::StaleResponse {
                seq: req.seq,
                latest: self.latest_load,
            });
            return LoadOutcome::Stale;
        }

        match result {
            Ok(mut page) => {
                self.normalizer.normalize_forest(&mut page.comments);
                let roots = page.comments.len();
                self.forest = page.comments;
                self.cursor = Cursor {
                    page: page.page,
                    total_pages: page.total_pages.max(1),
                    sort: req.query.sort,
                };
                self.requested = self.cursor.query();
                info!(
                    "Loaded page {}/{} ({} root comments)",
                    self.cursor.page, self.cursor.total_pages, roots
                );
                LoadOutcome::Replaced { roots }
            }
            Err(e) => {
                warn!("Failed to load comments: {}", e);
                self.record(Diagnostic::LoadFailed(e.to_string()));
                self.requested = self.cursor.query();
                LoadOutcome::Failed
            }
        }
    }
}
