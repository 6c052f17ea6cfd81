use loclib_dal::{ListingParams, Order};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Query of list pages, `?sort=family_name,-date_of_birth`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Listing {
    sort: Option<String>,
}

impl Listing {
    pub fn into_listing_params(self) -> ApiResult<ListingParams> {
        let mut params = ListingParams::default();
        if let Some(sort) = self.sort.filter(|s| !s.trim().is_empty()) {
            params = params.with_order(parse_ordering(&sort)?);
        }
        Ok(params)
    }
}

fn parse_ordering(orderings: &str) -> ApiResult<Vec<Order>> {
    if orderings.len() > 255 {
        return Err(ApiError::InvalidQuery("Sort too long".to_string()));
    }
    orderings
        .split(',')
        .map(|name| {
            let (field_name, descending) = match name.trim() {
                "" => return Err(ApiError::InvalidQuery("Empty ordering name".to_string())),
                name if name.len() > 100 => {
                    return Err(ApiError::InvalidQuery("Ordering name too long".to_string()))
                }
                name if name.starts_with('+') => (&name[1..], false),
                name if name.starts_with('-') => (&name[1..], true),
                name => (name, false),
            };

            let order = if descending {
                Order::Desc(field_name.to_string())
            } else {
                Order::Asc(field_name.to_string())
            };

            Ok(order)
        })
        .collect()
}
