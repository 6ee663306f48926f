pub mod attendance;
pub mod dashboard;
pub mod employee;
pub mod leave_request;
pub mod settings;

use chrono::{Local, NaiveDate, NaiveDateTime};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// `(page, per_page, offset)` with page starting at 1.
pub fn paginate(page: Option<u32>, per_page: Option<u32>) -> (u32, u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

/// Server-local wall clock. Attendance days follow it.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn local_today() -> NaiveDate {
    local_now().date()
}
