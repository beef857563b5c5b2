use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::{OrderStatus, TransactionStatus},
};

#[derive(Debug, Default, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

// Query strings do not survive `#[serde(flatten)]` with numeric fields, so
// each query repeats the paging fields.

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Matches name or description, case-insensitive.
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    /// First day included, `YYYY-MM-DD`.
    pub from: Option<NaiveDate>,
    /// Last day included, `YYYY-MM-DD`.
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub threshold: Option<i32>,
}

macro_rules! paged {
    ($($query:ty),+) => {
        $(impl $query {
            pub fn pagination(&self) -> Pagination {
                Pagination {
                    page: self.page,
                    per_page: self.per_page,
                }
            }
        })+
    };
}

paged!(ProductQuery, OrderListQuery, TransactionQuery, LowStockQuery);

impl OrderListQuery {
    pub fn status(&self) -> AppResult<Option<OrderStatus>> {
        parse_status(self.status.as_deref())
    }

    /// The day filter as a half-open UTC range.
    pub fn range(&self) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::bad_request("Start date is after end date"));
            }
        }
        let from = self.from.map(start_of_day);
        let to = self
            .to
            .and_then(|day| day.checked_add_days(Days::new(1)))
            .map(start_of_day);
        Ok((from, to))
    }
}

impl TransactionQuery {
    pub fn status(&self) -> AppResult<Option<TransactionStatus>> {
        parse_status(self.status.as_deref())
    }
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn parse_status<T>(raw: Option<&str>) -> AppResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim).filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all")) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::bad_request(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_range_includes_the_last_day() -> anyhow::Result<()> {
        let query = OrderListQuery {
            from: NaiveDate::from_ymd_opt(2024, 3, 1),
            to: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Default::default()
        };
        let (from, to) = query.range()?;
        assert_eq!(from.map(|d| d.to_rfc3339()).as_deref(), Some("2024-03-01T00:00:00+00:00"));
        assert_eq!(to.map(|d| d.to_rfc3339()).as_deref(), Some("2024-03-02T00:00:00+00:00"));
        Ok(())
    }

    #[test]
    fn all_means_no_status_filter() -> anyhow::Result<()> {
        let query = OrderListQuery {
            status: Some("all".into()),
            ..Default::default()
        };
        assert_eq!(query.status()?, None);
        let query = OrderListQuery {
            status: Some("shipped".into()),
            ..Default::default()
        };
        assert_eq!(query.status()?, Some(OrderStatus::Shipped));
        Ok(())
    }
}
