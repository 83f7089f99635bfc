//! Endpoint generation for the quarterly full-index archives

use chrono::{Datelike, NaiveDate};

use crate::models::{Endpoint, Quarter};

/// Build one endpoint per quarter for every year in `start_year..=end_year`,
/// ordered by year then quarter.
///
/// Quarters after the one containing `today` have not been published yet and
/// are left out. An inverted range yields no endpoints.
pub fn generate_endpoints(
    base_url: &str,
    start_year: i32,
    end_year: i32,
    today: NaiveDate,
) -> Vec<Endpoint> {
    let current_year = today.year();
    let current_quarter = Quarter::from_month(today.month()).unwrap_or(Quarter::Q4);

    let mut endpoints = Vec::new();
    for year in start_year..=end_year {
        for quarter in Quarter::ALL {
            if year > current_year || (year == current_year && quarter > current_quarter) {
                break;
            }
            endpoints.push(Endpoint::new(base_url, year, quarter));
        }
    }
    endpoints
}

/// [`generate_endpoints`] evaluated against the local clock
pub fn current_endpoints(base_url: &str, start_year: i32, end_year: i32) -> Vec<Endpoint> {
    generate_endpoints(
        base_url,
        start_year,
        end_year,
        chrono::Local::now().date_naive(),
    )
}
