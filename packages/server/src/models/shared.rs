use serde::Serialize;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (0-based).
    #[schema(example = 0)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 10)]
    pub size: u64,
    /// Total number of items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 5)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, size: u64, total: u64) -> Self {
        Self {
            page,
            size,
            total,
            total_pages: total.div_ceil(size.max(1)),
        }
    }
}
